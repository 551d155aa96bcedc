use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::{Booking, TourPackage};

/// Time-based refund tier applied when a booking is cancelled
///
/// Tiers are evaluated in declaration order and the first match wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RefundTier {
    /// Cancelled within 20 minutes of booking
    GracePeriod,
    /// Cancelled within a day of booking
    FirstDay,
    /// More than 5 days remain until departure
    EarlyNotice,
    /// Cancelled on the departure day
    DepartureDay,
    /// Anything else
    NoRefund,
}

impl RefundTier {
    /// Evaluate the tier for a booking made at `booking_date`, for a package
    /// departing on `start_date`, cancelled at `now`
    pub fn evaluate(booking_date: DateTime<Utc>, start_date: NaiveDate, now: DateTime<Utc>) -> Self {
        let elapsed = now - booking_date;
        let today = now.date_naive();

        if elapsed <= Duration::minutes(20) {
            RefundTier::GracePeriod
        } else if elapsed <= Duration::days(1) {
            RefundTier::FirstDay
        } else if start_date - today > Duration::days(5) {
            RefundTier::EarlyNotice
        } else if start_date == today {
            RefundTier::DepartureDay
        } else {
            RefundTier::NoRefund
        }
    }

    /// Fraction of the total cost returned to the user
    pub fn fraction(&self) -> Decimal {
        match self {
            RefundTier::GracePeriod => dec!(1.00),
            RefundTier::FirstDay => dec!(0.90),
            RefundTier::EarlyNotice => dec!(0.70),
            RefundTier::DepartureDay => dec!(0.40),
            RefundTier::NoRefund => dec!(0.00),
        }
    }
}

/// Refund owed for cancelling a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Refund {
    pub tier: RefundTier,
    pub amount: Decimal,
}

impl Refund {
    /// Compute the refund for cancelling `booking` on `package` at `now`
    ///
    /// This does not check whether the booking can still be cancelled.
    pub fn compute(booking: &Booking, package: &TourPackage, now: DateTime<Utc>) -> Self {
        let tier = RefundTier::evaluate(booking.booking_date, package.start_date, now);
        let amount = (booking.total_cost * tier.fraction()).round_dp(2);

        Self { tier, amount }
    }
}
