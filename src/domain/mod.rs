use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

pub mod refund;

/// Internal identifier of a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user and their point balance
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    /// Spendable points
    ///
    /// Only the ledger mutates this, and it never goes below zero.
    pub points: Decimal,
    /// Whether the user holds the administrative capability
    pub is_admin: bool,
}

/// A tour package that can be booked
///
/// Packages are managed outside of this crate and are read-only here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TourPackage {
    pub id: u64,
    /// Opaque external identifier, used by callers to reference the package
    pub tracking_id: Uuid,
    pub name: String,
    pub destination: String,
    /// Price per traveler, in points
    pub price: Decimal,
    /// Seat ceiling across all non-cancelled bookings
    pub capacity: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Last day on which the package can be booked or cancelled
    pub last_booking_date: Option<NaiveDate>,
}

impl TourPackage {
    /// The booking cutoff date, if it has passed at `now`
    ///
    /// The cutoff day itself is still open.
    pub fn closed_since(&self, now: DateTime<Utc>) -> Option<NaiveDate> {
        self.last_booking_date
            .filter(|cutoff| now.date_naive() > *cutoff)
    }

    pub fn booking_open(&self, now: DateTime<Utc>) -> bool {
        self.closed_since(now).is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BookingStatus {
    Pending,
    /// Never set by any operation today
    Confirmed,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// A reservation of seats on a package, paid for with points
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub id: u64,
    pub tracking_id: Uuid,
    pub user_id: UserId,
    /// Tracking id of the booked package
    pub package_id: Uuid,
    pub num_travelers: u32,
    /// Package price times the number of travelers, frozen at creation
    pub total_cost: Decimal,
    pub status: BookingStatus,
    pub booking_date: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Booking data before it is persisted
///
/// The store assigns the internal id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBooking {
    pub tracking_id: Uuid,
    pub user_id: UserId,
    pub package_id: Uuid,
    pub num_travelers: u32,
    pub total_cost: Decimal,
    pub booking_date: DateTime<Utc>,
}

impl NewBooking {
    pub fn into_booking(self, id: u64) -> Booking {
        Booking {
            id,
            tracking_id: self.tracking_id,
            user_id: self.user_id,
            package_id: self.package_id,
            num_travelers: self.num_travelers,
            total_cost: self.total_cost,
            status: BookingStatus::Pending,
            booking_date: self.booking_date,
            cancelled_at: None,
        }
    }
}
