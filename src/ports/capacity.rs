use uuid::Uuid;

/// Tracks how many seats are held on each package
///
/// Implementations keep a running counter per package and must apply each check-then-write
/// atomically, so that concurrent reservations can never exceed the capacity.
#[mockall::automock]
#[async_trait::async_trait]
pub trait CapacityPort: Send + Sync {
    /// Seats currently held by non-cancelled bookings
    async fn booked_seats(&self, package_id: Uuid) -> Result<u32, Error>;
    /// Hold `seats` on the package if that keeps it within `capacity`
    async fn reserve(&self, package_id: Uuid, capacity: u32, seats: u32)
        -> Result<Reservation, Error>;
    /// Give back `seats` previously held on the package
    ///
    /// Returns the number of seats still held afterwards.
    async fn release(&self, package_id: Uuid, seats: u32) -> Result<u32, Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reservation {
    /// The seats are now held; `booked_seats` includes them
    Reserved { booked_seats: u32 },
    /// Not enough seats left; nothing was changed
    Full { booked_seats: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Releasing more seats than are held
    ///
    /// This means the counter and the booking records disagree.
    #[error("cannot release {seats} seat(s) from package {package_id} holding {booked_seats}")]
    ReleaseUnderflow {
        package_id: Uuid,
        seats: u32,
        booked_seats: u32,
    },

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
