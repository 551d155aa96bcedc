use crate::{
    adapters::ErasedPoisonError,
    ports::capacity::{CapacityPort, Error, Reservation},
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use uuid::Uuid;

/// Running seat counters, one per package
#[derive(Clone, Debug, Default)]
pub struct MemoryCapacity {
    booked: Arc<Mutex<HashMap<Uuid, u32>>>,
}

#[async_trait::async_trait]
impl CapacityPort for MemoryCapacity {
    async fn booked_seats(&self, package_id: Uuid) -> Result<u32, Error> {
        Ok(self.booked.lock()?.get(&package_id).copied().unwrap_or(0))
    }

    async fn reserve(
        &self,
        package_id: Uuid,
        capacity: u32,
        seats: u32,
    ) -> Result<Reservation, Error> {
        let mut booked = self.booked.lock()?;
        let booked_seats = booked.entry(package_id).or_insert(0);

        // Check and write under the same lock
        match booked_seats.checked_add(seats) {
            Some(total) if total <= capacity => {
                *booked_seats = total;
                Ok(Reservation::Reserved {
                    booked_seats: total,
                })
            }
            _ => Ok(Reservation::Full {
                booked_seats: *booked_seats,
            }),
        }
    }

    async fn release(&self, package_id: Uuid, seats: u32) -> Result<u32, Error> {
        let mut booked = self.booked.lock()?;
        let booked_seats = booked.entry(package_id).or_insert(0);

        let remaining = booked_seats
            .checked_sub(seats)
            .ok_or(Error::ReleaseUnderflow {
                package_id,
                seats,
                booked_seats: *booked_seats,
            })?;
        *booked_seats = remaining;

        Ok(remaining)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError::from(err)))
    }
}
