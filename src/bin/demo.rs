//! Book and cancel a tour against the in-memory adapters.
//!
//! ```bash
//! RUST_LOG=debug cargo run --bin demo
//! ```

use std::{num::NonZeroU32, sync::Arc};

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use tour_booking_ledger::{
    adapters::{
        capacity::memory::MemoryCapacity, clock::SystemClock, database::memory::MemoryDatabase,
        ledger::memory::MemoryLedger, session::memory::MemorySessions,
    },
    commands::{
        cancel_booking::{CancelBookingRequest, CancelBookingResponse},
        create_booking::CreateBookingRequest,
        grant_points::GrantPointsRequest,
    },
    domain::TourPackage,
    queries::package_details::PackageDetailsRequest,
    telemetry, Config, DomainLogic,
};
use tower::{BoxError, ServiceExt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;
    telemetry::init(&config.log_filter)?;

    let database = Arc::new(MemoryDatabase::default());
    let capacity = Arc::new(MemoryCapacity::default());
    let ledger = Arc::new(MemoryLedger::new(config.default_user_points));
    let sessions = Arc::new(MemorySessions::default());

    let today = Utc::now().date_naive();
    let package = TourPackage {
        id: 1,
        tracking_id: Uuid::new_v4(),
        name: "Sundarbans Explorer".to_string(),
        destination: "Khulna".to_string(),
        price: dec!(100.00),
        capacity: 10,
        start_date: today + Duration::days(14),
        end_date: today + Duration::days(17),
        last_booking_date: Some(today + Duration::days(7)),
    };
    database.put_package(package.clone())?;
    let admin = ledger.register_user("admin", true)?;
    let traveler = ledger.register_user("traveler", false)?;
    sessions.issue(traveler.user_id)?;

    let logic = DomainLogic::new(
        database,
        capacity,
        ledger,
        sessions,
        Arc::new(SystemClock),
        config,
    );

    logic
        .clone()
        .oneshot(GrantPointsRequest {
            admin_id: admin.user_id,
            user_id: traveler.user_id,
            amount: dec!(400),
        })
        .await?;

    let booked = logic
        .clone()
        .oneshot(CreateBookingRequest {
            user_id: traveler.user_id,
            package_id: package.tracking_id,
            num_travelers: NonZeroU32::new(2).ok_or("zero travelers")?,
        })
        .await?;
    tracing::info!(
        booking_id = %booked.booking.tracking_id,
        remaining_points = %booked.remaining_points,
        available_seats = booked.available_seats,
        "booked"
    );

    let cancelled = logic
        .clone()
        .oneshot(CancelBookingRequest {
            user_id: traveler.user_id,
            package_id: package.tracking_id,
            booking_id: booked.booking.tracking_id,
        })
        .await?;
    if let CancelBookingResponse::Cancelled(cancellation) = cancelled {
        tracing::info!(
            refund = %cancellation.refund.amount,
            remaining_points = %cancellation.remaining_points,
            "cancelled"
        );
    }

    let details = logic
        .oneshot(PackageDetailsRequest {
            package_id: package.tracking_id,
        })
        .await?;
    tracing::info!(
        booked_seats = details.booked_seats,
        available_seats = details.available_seats,
        "package after cancellation"
    );

    Ok(())
}
