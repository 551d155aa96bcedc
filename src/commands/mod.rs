use std::{fmt, sync::Arc};

use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    config::Config,
    domain::UserId,
    ports::{
        capacity::{self, CapacityPort},
        clock::Clock,
        database::{self, DatabasePort},
        ledger::{self, Debit, LedgerPort},
        session::SessionPort,
    },
};

pub mod cancel_booking;
pub mod charge_request;
pub mod create_booking;
pub mod grant_points;

#[cfg(test)]
pub(crate) mod test_support;

/// Booking and point operations over a set of ports
///
/// Every request type is served through [`tower::Service`].
pub struct DomainLogic<D, C, L, S> {
    pub(crate) database: Arc<D>,
    pub(crate) capacity: Arc<C>,
    pub(crate) ledger: Arc<L>,
    sessions: Arc<S>,
    pub(crate) clock: Arc<dyn Clock>,
    config: Arc<Config>,
    /// Serializes cancellations of the same booking
    booking_locks: Arc<DashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl<D, C, L, S> DomainLogic<D, C, L, S> {
    pub fn new(
        database: Arc<D>,
        capacity: Arc<C>,
        ledger: Arc<L>,
        sessions: Arc<S>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self {
        Self {
            database,
            capacity,
            ledger,
            sessions,
            clock,
            config: Arc::new(config),
            booking_locks: Arc::default(),
        }
    }
}

impl<D, C, L, S> Clone for DomainLogic<D, C, L, S> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            capacity: self.capacity.clone(),
            ledger: self.ledger.clone(),
            sessions: self.sessions.clone(),
            clock: self.clock.clone(),
            config: self.config.clone(),
            booking_locks: self.booking_locks.clone(),
        }
    }
}

impl<D, C, L, S> DomainLogic<D, C, L, S>
where
    D: DatabasePort,
    C: CapacityPort,
    L: LedgerPort,
    S: SessionPort,
{
    fn booking_lock(&self, booking_id: Uuid) -> BookingLock {
        let mutex = self.booking_locks.entry(booking_id).or_default().clone();

        BookingLock {
            locks: self.booking_locks.clone(),
            booking_id,
            mutex,
        }
    }

    /// Revoke the user's sessions if `debit` emptied their balance
    async fn revoke_if_depleted(&self, user_id: UserId, debit: &Debit) {
        if !debit.depleted {
            return;
        }

        match self.sessions.revoke_user_sessions(user_id).await {
            Ok(revoked) => tracing::info!(%user_id, revoked, "balance depleted, sessions revoked"),
            Err(err) => tracing::error!(%user_id, error = %err, "failed to revoke sessions"),
        }
    }

    /// Compensation: give back seats held by a failed operation
    async fn release_seats(&self, package_id: Uuid, seats: u32) {
        if let Err(err) = self.capacity.release(package_id, seats).await {
            tracing::error!(%package_id, seats, error = %err, "failed to release seats");
        }
    }

    /// Compensation: return points debited by a failed operation
    async fn restore_points(&self, user_id: UserId, amount: Decimal) {
        if let Err(err) = self.ledger.credit(user_id, amount).await {
            tracing::error!(%user_id, %amount, error = %err, "failed to restore points");
        }
    }
}

/// Handle on the lock of one booking
///
/// The map entry is removed when the last handle is dropped, including when the future holding
/// it is dropped before completing.
pub(crate) struct BookingLock {
    locks: Arc<DashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
    booking_id: Uuid,
    mutex: Arc<tokio::sync::Mutex<()>>,
}

impl BookingLock {
    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.mutex.lock().await
    }
}

impl Drop for BookingLock {
    fn drop(&mut self) {
        // Only the map and this handle still refer to the mutex
        self.locks.remove_if(&self.booking_id, |_, mutex| {
            Arc::ptr_eq(mutex, &self.mutex) && Arc::strong_count(mutex) == 2
        });
    }
}

/// Something that could not be found, or is not visible to the caller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Package(Uuid),
    Booking(Uuid),
    User(UserId),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Package(id) => write!(f, "package {id}"),
            Resource::Booking(id) => write!(f, "booking {id}"),
            Resource::User(id) => write!(f, "user {id}"),
        }
    }
}

/// Machine-readable class of an [`Error`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PreconditionFailed,
    Forbidden,
    /// Store failures; the caller may retry
    InternalFailure,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(Resource),
    #[error("bookings closed on {0}")]
    BookingWindowClosed(NaiveDate),
    #[error("cancellations closed on {0}")]
    CancellationWindowClosed(NaiveDate),
    #[error("insufficient points: {required} required, {available} available")]
    InsufficientPoints {
        required: Decimal,
        available: Decimal,
    },
    #[error("package is full: {requested} seat(s) requested, {available} available")]
    PackageFull { requested: u32, available: u32 },
    #[error("administrative capability required")]
    Forbidden,

    // Port failures only name the failing store; details stay in `source()`
    #[error("storage failure")]
    Database(#[source] database::Error),
    #[error("capacity tracking failure")]
    Capacity(#[source] capacity::Error),
    #[error("ledger failure")]
    Ledger(#[source] ledger::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::BookingWindowClosed(_)
            | Error::CancellationWindowClosed(_)
            | Error::InsufficientPoints { .. }
            | Error::PackageFull { .. } => ErrorKind::PreconditionFailed,
            Error::Forbidden => ErrorKind::Forbidden,
            Error::Database(_) | Error::Capacity(_) | Error::Ledger(_) => {
                ErrorKind::InternalFailure
            }
        }
    }
}

impl From<database::Error> for Error {
    fn from(err: database::Error) -> Self {
        match err {
            database::Error::PackageDoesNotExist(id) => Error::NotFound(Resource::Package(id)),
            database::Error::BookingDoesNotExist(id) => Error::NotFound(Resource::Booking(id)),
            err => Error::Database(err),
        }
    }
}

impl From<ledger::Error> for Error {
    fn from(err: ledger::Error) -> Self {
        match err {
            ledger::Error::UserDoesNotExist(id) => Error::NotFound(Resource::User(id)),
            err => Error::Ledger(err),
        }
    }
}

impl From<capacity::Error> for Error {
    fn from(err: capacity::Error) -> Self {
        Error::Capacity(err)
    }
}
