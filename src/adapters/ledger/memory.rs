use crate::{
    adapters::ErasedPoisonError,
    domain::{User, UserId},
    ports::ledger::{Debit, Error, LedgerPort},
};
use rust_decimal::Decimal;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    last_user_id: u64,
}

#[derive(Clone, Debug)]
pub struct MemoryLedger {
    state: Arc<Mutex<State>>,
    default_points: Decimal,
}

impl MemoryLedger {
    /// Create a ledger where new users start with `default_points`
    pub fn new(default_points: Decimal) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            default_points,
        }
    }

    /// Register a new user with the default balance
    pub fn register_user(&self, username: &str, is_admin: bool) -> Result<User, Error> {
        let mut state = self.state.lock()?;
        state.last_user_id += 1;
        let user = User {
            user_id: UserId(state.last_user_id),
            username: username.to_string(),
            points: self.default_points,
            is_admin,
        };
        state.users.insert(user.user_id, user.clone());

        Ok(user)
    }
}

#[async_trait::async_trait]
impl LedgerPort for MemoryLedger {
    async fn get_user(&self, user_id: UserId) -> Result<User, Error> {
        self.state
            .lock()?
            .users
            .get(&user_id)
            .cloned()
            .ok_or(Error::UserDoesNotExist(user_id))
    }

    async fn debit(&self, user_id: UserId, amount: Decimal) -> Result<Option<Debit>, Error> {
        let mut state = self.state.lock()?;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or(Error::UserDoesNotExist(user_id))?;

        if user.points < amount {
            return Ok(None);
        }

        let was_positive = user.points > Decimal::ZERO;
        user.points -= amount;

        Ok(Some(Debit {
            balance: user.points,
            depleted: was_positive && user.points <= Decimal::ZERO,
        }))
    }

    async fn credit(&self, user_id: UserId, amount: Decimal) -> Result<Decimal, Error> {
        let mut state = self.state.lock()?;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or(Error::UserDoesNotExist(user_id))?;
        user.points += amount;

        Ok(user.points)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(Decimal::ZERO)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError::from(err)))
    }
}
