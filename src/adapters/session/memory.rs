use crate::{
    adapters::ErasedPoisonError,
    domain::UserId,
    ports::session::{Error, SessionPort},
};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, PoisonError},
};
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    /// Tokens issued and not yet revoked, per user
    outstanding: HashMap<UserId, HashSet<Uuid>>,
    blacklisted: HashSet<Uuid>,
}

/// Token registry with a blacklist
#[derive(Clone, Debug, Default)]
pub struct MemorySessions {
    state: Arc<Mutex<State>>,
}

impl MemorySessions {
    /// Issue a new token for the user
    pub fn issue(&self, user_id: UserId) -> Result<Uuid, Error> {
        let token = Uuid::new_v4();
        self.state
            .lock()?
            .outstanding
            .entry(user_id)
            .or_default()
            .insert(token);

        Ok(token)
    }

    pub fn is_revoked(&self, token: Uuid) -> Result<bool, Error> {
        Ok(self.state.lock()?.blacklisted.contains(&token))
    }
}

#[async_trait::async_trait]
impl SessionPort for MemorySessions {
    async fn revoke_user_sessions(&self, user_id: UserId) -> Result<usize, Error> {
        let mut state = self.state.lock()?;
        let tokens = state.outstanding.remove(&user_id).unwrap_or_default();
        let revoked = tokens.len();
        state.blacklisted.extend(tokens);

        Ok(revoked)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError::from(err)))
    }
}
