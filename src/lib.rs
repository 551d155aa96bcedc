//! Booking and points ledger for tour packages.
//!
//! Users pay for tour bookings with points. Booking a package holds seats against its capacity
//! and debits the user's balance; cancelling refunds a share of the cost that depends on how long
//! ago the booking was made and how close the departure is.
//!
//! The crate follows a ports and adapters layout:
//!
//! - [`domain`]: users, packages, bookings and the refund policy
//! - [`ports`]: traits for the stores and collaborators the logic depends on
//! - [`adapters`]: in-memory implementations of every port
//! - [`commands`] and [`queries`]: [`tower::Service`] implementations on
//!   [`DomainLogic`](commands::DomainLogic), one per request type

pub mod adapters;
pub mod commands;
pub mod config;
pub mod domain;
pub mod ports;
pub mod queries;
pub mod telemetry;

pub use commands::{DomainLogic, Error, ErrorKind};
pub use config::Config;
