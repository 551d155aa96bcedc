//! Read-only requests served by [`DomainLogic`](crate::commands::DomainLogic).

pub mod booking_history;
pub mod package_details;
pub mod user_points;
