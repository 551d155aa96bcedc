use std::sync::PoisonError;

pub mod capacity;
pub mod clock;
pub mod database;
pub mod ledger;
pub mod session;

/// Erased [`PoisonError`]
///
/// `PoisonError` keeps the `MutexGuard` internally, which is not send. Thus we erase the error
/// and only keep the string representation instead.
#[derive(Debug, thiserror::Error)]
#[error("poison error: {0}")]
pub struct ErasedPoisonError(String);

impl<T> From<PoisonError<T>> for ErasedPoisonError {
    fn from(err: PoisonError<T>) -> Self {
        Self(err.to_string())
    }
}
