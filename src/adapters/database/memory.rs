use crate::{
    adapters::ErasedPoisonError,
    domain::{Booking, BookingStatus, NewBooking, TourPackage, UserId},
    ports::database::{DatabasePort, Error},
};
use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    packages: HashMap<Uuid, TourPackage>,
    bookings: HashMap<Uuid, Booking>,
    last_booking_id: u64,
}

#[derive(Clone, Debug)]
pub struct MemoryDatabase {
    state: Arc<Mutex<State>>,
}

impl MemoryDatabase {
    /// Store a package, replacing any package with the same tracking id
    ///
    /// Packages are managed by an administrative collaborator; this is its entry point.
    pub fn put_package(&self, package: TourPackage) -> Result<(), Error> {
        self.state
            .lock()?
            .packages
            .insert(package.tracking_id, package);
        Ok(())
    }
}

#[async_trait::async_trait]
impl DatabasePort for MemoryDatabase {
    async fn get_package(&self, package_id: Uuid) -> Result<TourPackage, Error> {
        self.state
            .lock()?
            .packages
            .get(&package_id)
            .cloned()
            .ok_or(Error::PackageDoesNotExist(package_id))
    }

    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking, Error> {
        let mut state = self.state.lock()?;
        state.last_booking_id += 1;
        let booking = booking.into_booking(state.last_booking_id);
        state.bookings.insert(booking.tracking_id, booking.clone());

        Ok(booking)
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, Error> {
        self.state
            .lock()?
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or(Error::BookingDoesNotExist(booking_id))
    }

    async fn list_bookings(&self, user_id: UserId) -> Result<Vec<Booking>, Error> {
        let bookings = self
            .state
            .lock()?
            .bookings
            .values()
            .filter(|booking| booking.user_id == user_id)
            .cloned()
            .collect();

        Ok(bookings)
    }

    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        at: DateTime<Utc>,
    ) -> Result<Booking, Error> {
        let mut state = self.state.lock()?;
        let booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or(Error::BookingDoesNotExist(booking_id))?;

        // Only move from the status the caller observed
        if booking.status != from {
            return Err(Error::StatusConflict {
                booking_id,
                expected: from,
                actual: booking.status,
            });
        }

        booking.status = to;
        booking.cancelled_at = match to {
            BookingStatus::Cancelled => Some(at),
            BookingStatus::Pending | BookingStatus::Confirmed => None,
        };

        Ok(booking.clone())
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
        }
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError::from(err)))
    }
}
