use crate::domain::UserId;

/// Authentication sessions owned by the auth subsystem
#[mockall::automock]
#[async_trait::async_trait]
pub trait SessionPort: Send + Sync {
    /// Revoke every outstanding token of the user
    ///
    /// Returns how many tokens were revoked.
    async fn revoke_user_sessions(&self, user_id: UserId) -> Result<usize, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
