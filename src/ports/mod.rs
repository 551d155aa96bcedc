pub mod capacity;
pub mod clock;
pub mod database;
pub mod ledger;
pub mod session;
