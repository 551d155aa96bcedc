use rust_decimal::Decimal;

use crate::domain::{User, UserId};

/// Point balances of users
///
/// Every debit and credit is a single atomic read-modify-write on the balance.
#[mockall::automock]
#[async_trait::async_trait]
pub trait LedgerPort: Send + Sync {
    async fn get_user(&self, user_id: UserId) -> Result<User, Error>;
    /// Subtract `amount` if the balance covers it
    ///
    /// Returns `None` without changing anything when the balance is too low.
    async fn debit(&self, user_id: UserId, amount: Decimal) -> Result<Option<Debit>, Error>;
    /// Add `amount` and return the new balance
    async fn credit(&self, user_id: UserId, amount: Decimal) -> Result<Decimal, Error>;
}

/// Outcome of a successful debit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Debit {
    /// Balance after the debit
    pub balance: Decimal,
    /// Whether this debit took a positive balance down to zero
    pub depleted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Domain-level error when a user does not exist
    #[error("user {0} does not exist")]
    UserDoesNotExist(UserId),

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
