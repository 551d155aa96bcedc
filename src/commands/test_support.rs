//! Shared fixtures for service tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::{
    adapters::{
        capacity::memory::MemoryCapacity, clock::FixedClock, database::memory::MemoryDatabase,
        ledger::memory::MemoryLedger, session::memory::MemorySessions,
    },
    config::Config,
    domain::{TourPackage, User},
};

use super::DomainLogic;

pub type MemoryLogic = DomainLogic<MemoryDatabase, MemoryCapacity, MemoryLedger, MemorySessions>;

/// In-memory adapters shared by every service built from it
pub struct Harness {
    pub database: Arc<MemoryDatabase>,
    pub capacity: Arc<MemoryCapacity>,
    pub ledger: Arc<MemoryLedger>,
    pub sessions: Arc<MemorySessions>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            database: Arc::new(MemoryDatabase::default()),
            capacity: Arc::new(MemoryCapacity::default()),
            ledger: Arc::new(MemoryLedger::new(dec!(0))),
            sessions: Arc::new(MemorySessions::default()),
        }
    }

    /// A service whose clock is stopped at `now`
    pub fn logic_at(&self, now: DateTime<Utc>) -> MemoryLogic {
        DomainLogic::new(
            self.database.clone(),
            self.capacity.clone(),
            self.ledger.clone(),
            self.sessions.clone(),
            Arc::new(FixedClock::new(now)),
            Config::default(),
        )
    }

    pub async fn user_with(&self, points: Decimal) -> User {
        use crate::ports::ledger::LedgerPort;

        let user = self.ledger.register_user("traveler", false).unwrap();
        self.ledger.credit(user.user_id, points).await.unwrap();
        self.ledger.get_user(user.user_id).await.unwrap()
    }

    pub fn admin(&self) -> User {
        self.ledger.register_user("admin", true).unwrap()
    }

    pub fn package(&self, package: TourPackage) -> TourPackage {
        self.database.put_package(package.clone()).unwrap();
        package
    }
}

/// Reference point for all service tests
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 25, 10, 0, 0).unwrap()
}

/// A 100-point, 10-seat package departing 7 days after [`t0`]
pub fn tour_package() -> TourPackage {
    TourPackage {
        id: 1,
        tracking_id: Uuid::new_v4(),
        name: "Test Tour".to_string(),
        destination: "Test Destination".to_string(),
        price: dec!(100.00),
        capacity: 10,
        start_date: (t0() + Duration::days(7)).date_naive(),
        end_date: (t0() + Duration::days(12)).date_naive(),
        last_booking_date: None,
    }
}
