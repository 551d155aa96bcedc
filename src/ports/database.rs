use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Booking, BookingStatus, NewBooking, TourPackage, UserId};

/// Storage for tour packages and booking records
#[mockall::automock]
#[async_trait::async_trait]
pub trait DatabasePort: Send + Sync {
    async fn get_package(&self, package_id: Uuid) -> Result<TourPackage, Error>;
    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking, Error>;
    async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, Error>;
    /// All bookings of a user, in no particular order
    async fn list_bookings(&self, user_id: UserId) -> Result<Vec<Booking>, Error>;
    /// Move a booking from `from` to `to`
    ///
    /// This is a compare-and-set: it fails with [`Error::StatusConflict`] if the booking is not
    /// currently in the `from` status. `at` is recorded as the cancellation time when moving to
    /// [`BookingStatus::Cancelled`] and cleared otherwise.
    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        at: DateTime<Utc>,
    ) -> Result<Booking, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("package {0} does not exist")]
    PackageDoesNotExist(Uuid),

    #[error("booking {0} does not exist")]
    BookingDoesNotExist(Uuid),

    /// The booking was not in the expected status
    #[error("booking {booking_id} is {actual}, expected {expected}")]
    StatusConflict {
        booking_id: Uuid,
        expected: BookingStatus,
        actual: BookingStatus,
    },

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
