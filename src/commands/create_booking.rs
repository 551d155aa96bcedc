use std::{
    future::Future,
    num::NonZeroU32,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::{Booking, NewBooking, UserId},
    ports::{
        capacity::{CapacityPort, Reservation},
        database::DatabasePort,
        ledger::LedgerPort,
        session::SessionPort,
    },
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tower::Service;
use tracing::Instrument;
use uuid::Uuid;

use super::{DomainLogic, Error};

pub struct CreateBookingRequest {
    pub user_id: UserId,
    /// Tracking id of the package
    pub package_id: Uuid,
    pub num_travelers: NonZeroU32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreateBookingResponse {
    pub booking: Booking,
    /// Balance left after paying for the booking
    pub remaining_points: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub last_booking_date: Option<NaiveDate>,
    /// Seats held on the package, including this booking
    pub booked_seats: u32,
    pub available_seats: u32,
}

impl<D, C, L, S> Service<CreateBookingRequest> for DomainLogic<D, C, L, S>
where
    D: DatabasePort + 'static,
    C: CapacityPort + 'static,
    L: LedgerPort + 'static,
    S: SessionPort + 'static,
{
    type Response = CreateBookingResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CreateBookingRequest) -> Self::Future {
        let logic = self.clone();
        let span = tracing::info_span!(
            "create_booking",
            user_id = %req.user_id,
            package_id = %req.package_id,
            num_travelers = req.num_travelers.get(),
        );
        Box::pin(async move { logic.create_booking(req).await }.instrument(span))
    }
}

impl<D, C, L, S> DomainLogic<D, C, L, S>
where
    D: DatabasePort,
    C: CapacityPort,
    L: LedgerPort,
    S: SessionPort,
{
    async fn create_booking(
        &self,
        req: CreateBookingRequest,
    ) -> Result<CreateBookingResponse, Error> {
        let now = self.clock.now();
        let seats = req.num_travelers.get();

        // Validate before touching any balance or seat
        let package = self.database.get_package(req.package_id).await?;
        if let Some(cutoff) = package.closed_since(now) {
            tracing::warn!(%cutoff, "booking window closed");
            return Err(Error::BookingWindowClosed(cutoff));
        }

        let total_cost = package.price * Decimal::from(seats);
        let user = self.ledger.get_user(req.user_id).await?;
        if user.points < total_cost {
            tracing::warn!(%total_cost, points = %user.points, "insufficient points");
            return Err(Error::InsufficientPoints {
                required: total_cost,
                available: user.points,
            });
        }

        // Hold the seats
        let booked_seats = match self
            .capacity
            .reserve(package.tracking_id, package.capacity, seats)
            .await?
        {
            Reservation::Reserved { booked_seats } => booked_seats,
            Reservation::Full { booked_seats } => {
                tracing::warn!(booked_seats, capacity = package.capacity, "package full");
                return Err(Error::PackageFull {
                    requested: seats,
                    available: package.capacity.saturating_sub(booked_seats),
                });
            }
        };

        // Pay for them. The balance may have moved since it was read above.
        let debit = match self.ledger.debit(user.user_id, total_cost).await {
            Ok(Some(debit)) => debit,
            Ok(None) => {
                self.release_seats(package.tracking_id, seats).await;
                let available = self
                    .ledger
                    .get_user(user.user_id)
                    .await
                    .map_or(user.points, |user| user.points);
                tracing::warn!(%total_cost, points = %available, "insufficient points");
                return Err(Error::InsufficientPoints {
                    required: total_cost,
                    available,
                });
            }
            Err(err) => {
                self.release_seats(package.tracking_id, seats).await;
                return Err(err.into());
            }
        };

        // Record the booking
        let new_booking = NewBooking {
            tracking_id: Uuid::new_v4(),
            user_id: user.user_id,
            package_id: package.tracking_id,
            num_travelers: seats,
            total_cost,
            booking_date: now,
        };
        let booking = match self.database.insert_booking(new_booking).await {
            Ok(booking) => booking,
            Err(err) => {
                tracing::error!(error = %err, "failed to store booking, rolling back");
                self.restore_points(user.user_id, total_cost).await;
                self.release_seats(package.tracking_id, seats).await;
                return Err(err.into());
            }
        };

        self.revoke_if_depleted(user.user_id, &debit).await;

        tracing::info!(
            booking_id = %booking.tracking_id,
            %total_cost,
            remaining_points = %debit.balance,
            booked_seats,
            "booking created"
        );

        Ok(CreateBookingResponse {
            booking,
            remaining_points: debit.balance,
            start_date: package.start_date,
            end_date: package.end_date,
            last_booking_date: package.last_booking_date,
            booked_seats,
            available_seats: package.capacity.saturating_sub(booked_seats),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::{
            capacity::memory::MemoryCapacity, clock::FixedClock, ledger::memory::MemoryLedger,
        },
        commands::{
            test_support::{t0, tour_package, Harness},
            ErrorKind,
        },
        config::Config,
        domain::{BookingStatus, TourPackage},
        ports::{database::MockDatabasePort, session::MockSessionPort},
    };
    use chrono::Duration;
    use mockall::predicate::*;
    use rstest::*;
    use rust_decimal_macros::dec;
    use speculoos::prelude::*;
    use std::sync::Arc;
    use tower::{BoxError, ServiceExt};

    fn travelers(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[fixture]
    fn harness() -> Harness {
        Harness::new()
    }

    #[rstest]
    #[tokio::test]
    async fn test_call(harness: Harness) -> Result<(), BoxError> {
        // GIVEN
        // * a 100-point package with 10 free seats
        // * a user with 500 points
        let package = harness.package(tour_package());
        let user = harness.user_with(dec!(500.00)).await;
        let logic = harness.logic_at(t0());

        // WHEN booking 2 travelers
        let req = CreateBookingRequest {
            user_id: user.user_id,
            package_id: package.tracking_id,
            num_travelers: travelers(2),
        };
        let res = logic.clone().oneshot(req).await;

        // THEN
        // * the booking is pending and costs 200 points
        // * the user has 300 points left
        // * 2 seats are held
        assert_that!(res).is_ok().matches(|res| {
            res.booking.status == BookingStatus::Pending
                && res.booking.total_cost == dec!(200.00)
                && res.booking.booking_date == t0()
                && res.booking.user_id == user.user_id
                && res.remaining_points == dec!(300.00)
                && res.booked_seats == 2
                && res.available_seats == 8
                && res.start_date == package.start_date
        });
        assert_that!(harness.capacity.booked_seats(package.tracking_id).await?).is_equal_to(2);
        assert_that!(harness.ledger.get_user(user.user_id).await?.points)
            .is_equal_to(dec!(300.00));

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_unknown_package(harness: Harness) -> Result<(), BoxError> {
        let user = harness.user_with(dec!(500.00)).await;
        let logic = harness.logic_at(t0());

        let req = CreateBookingRequest {
            user_id: user.user_id,
            package_id: Uuid::new_v4(),
            num_travelers: travelers(1),
        };
        let res = logic.clone().oneshot(req).await;

        assert_that!(res)
            .is_err()
            .matches(|err| err.kind() == ErrorKind::NotFound);

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_booking_window_closed(harness: Harness) -> Result<(), BoxError> {
        // GIVEN a package whose last booking date was yesterday
        let package = harness.package(TourPackage {
            last_booking_date: Some((t0() - Duration::days(1)).date_naive()),
            ..tour_package()
        });
        let user = harness.user_with(dec!(500.00)).await;
        let logic = harness.logic_at(t0());

        // WHEN booking it
        let req = CreateBookingRequest {
            user_id: user.user_id,
            package_id: package.tracking_id,
            num_travelers: travelers(1),
        };
        let res = logic.clone().oneshot(req).await;

        // THEN
        // * the booking is rejected
        // * no points are debited and no seats are held
        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, Error::BookingWindowClosed(_)));
        assert_that!(harness.ledger.get_user(user.user_id).await?.points)
            .is_equal_to(dec!(500.00));
        assert_that!(harness.capacity.booked_seats(package.tracking_id).await?).is_equal_to(0);

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_insufficient_points(harness: Harness) -> Result<(), BoxError> {
        let package = harness.package(tour_package());
        let user = harness.user_with(dec!(199.99)).await;
        let logic = harness.logic_at(t0());

        let req = CreateBookingRequest {
            user_id: user.user_id,
            package_id: package.tracking_id,
            num_travelers: travelers(2),
        };
        let res = logic.clone().oneshot(req).await;

        assert_that!(res).is_err().matches(|err| {
            matches!(
                err,
                Error::InsufficientPoints { required, available }
                    if *required == dec!(200.00) && *available == dec!(199.99)
            )
        });
        assert_that!(harness.capacity.booked_seats(package.tracking_id).await?).is_equal_to(0);

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_package_full(harness: Harness) -> Result<(), BoxError> {
        // GIVEN a 3-seat package with 2 seats already booked
        let package = harness.package(TourPackage {
            capacity: 3,
            ..tour_package()
        });
        let user = harness.user_with(dec!(1000.00)).await;
        let logic = harness.logic_at(t0());
        let req = CreateBookingRequest {
            user_id: user.user_id,
            package_id: package.tracking_id,
            num_travelers: travelers(2),
        };
        logic.clone().oneshot(req).await?;

        // WHEN booking 2 more
        let req = CreateBookingRequest {
            user_id: user.user_id,
            package_id: package.tracking_id,
            num_travelers: travelers(2),
        };
        let res = logic.clone().oneshot(req).await;

        // THEN the package is full and the second booking is not charged
        assert_that!(res).is_err().matches(|err| {
            matches!(
                err,
                Error::PackageFull {
                    requested: 2,
                    available: 1
                }
            )
        });
        assert_that!(harness.ledger.get_user(user.user_id).await?.points)
            .is_equal_to(dec!(800.00));

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_depleting_balance_revokes_sessions() -> Result<(), BoxError> {
        // GIVEN
        // * a user with exactly enough points for 2 bookings
        // * a session port expecting a single revocation
        let ledger = Arc::new(MemoryLedger::new(dec!(200.00)));
        let user = ledger.register_user("traveler", false)?;
        let capacity = Arc::new(MemoryCapacity::default());
        let database = Arc::new(crate::adapters::database::memory::MemoryDatabase::default());
        let package = tour_package();
        database.put_package(package.clone())?;
        let mut sessions = MockSessionPort::new();
        sessions
            .expect_revoke_user_sessions()
            .times(1)
            .with(eq(user.user_id))
            .returning(|_| Ok(3));
        let logic = DomainLogic::new(
            database,
            capacity,
            ledger.clone(),
            Arc::new(sessions),
            Arc::new(FixedClock::new(t0())),
            Config::default(),
        );

        // WHEN booking twice, then trying a third time
        for _ in 0..2 {
            let req = CreateBookingRequest {
                user_id: user.user_id,
                package_id: package.tracking_id,
                num_travelers: travelers(1),
            };
            logic.clone().oneshot(req).await?;
        }
        let req = CreateBookingRequest {
            user_id: user.user_id,
            package_id: package.tracking_id,
            num_travelers: travelers(1),
        };
        let res = logic.clone().oneshot(req).await;

        // THEN
        // * the third booking is rejected
        // * sessions were revoked exactly once
        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, Error::InsufficientPoints { .. }));
        Arc::into_inner(logic.sessions).unwrap().checkpoint();

        Ok(())
    }

    #[rstest]
    #[tokio::test]
    async fn test_store_failure_rolls_back() -> Result<(), BoxError> {
        // GIVEN a database that cannot store bookings
        let package = tour_package();
        let mut database = MockDatabasePort::new();
        let stored = package.clone();
        database
            .expect_get_package()
            .with(eq(package.tracking_id))
            .returning(move |_| Ok(stored.clone()));
        database
            .expect_insert_booking()
            .times(1)
            .returning(|_| Err(crate::ports::database::Error::Adapter("disk full".into())));
        let ledger = Arc::new(MemoryLedger::new(dec!(500.00)));
        let user = ledger.register_user("traveler", false)?;
        let capacity = Arc::new(MemoryCapacity::default());
        let logic = DomainLogic::new(
            Arc::new(database),
            capacity.clone(),
            ledger.clone(),
            Arc::new(MockSessionPort::new()),
            Arc::new(FixedClock::new(t0())),
            Config::default(),
        );

        // WHEN booking
        let req = CreateBookingRequest {
            user_id: user.user_id,
            package_id: package.tracking_id,
            num_travelers: travelers(2),
        };
        let res = logic.clone().oneshot(req).await;

        // THEN
        // * the failure is reported as internal
        // * the points and seats are given back
        assert_that!(res)
            .is_err()
            .matches(|err| err.kind() == ErrorKind::InternalFailure);
        assert_that!(ledger.get_user(user.user_id).await?.points).is_equal_to(dec!(500.00));
        assert_that!(capacity.booked_seats(package.tracking_id).await?).is_equal_to(0);

        Ok(())
    }

    /// Two users racing for the last seat
    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_last_seat(harness: Harness) -> Result<(), BoxError> {
        // GIVEN a 1-seat package and two users with enough points
        let package = harness.package(TourPackage {
            capacity: 1,
            ..tour_package()
        });
        let first = harness.user_with(dec!(500.00)).await;
        let second = harness.user_with(dec!(500.00)).await;
        let logic = harness.logic_at(t0());
        let package_id = package.tracking_id;

        // WHEN both book at the same time
        let handles = [first.user_id, second.user_id].map(|user_id| {
            let logic = logic.clone();
            tokio::spawn(async move {
                let req = CreateBookingRequest {
                    user_id,
                    package_id,
                    num_travelers: travelers(1),
                };
                logic.oneshot(req).await
            })
        });
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await?);
        }

        // THEN exactly one succeeds and the other finds the package full
        let booked = results.iter().filter(|res| res.is_ok()).count();
        let full = results
            .iter()
            .filter(|res| matches!(res, Err(Error::PackageFull { .. })))
            .count();
        assert_that!(booked).is_equal_to(1);
        assert_that!(full).is_equal_to(1);
        assert_that!(harness.capacity.booked_seats(package.tracking_id).await?).is_equal_to(1);

        // Only the winner paid
        let first = harness.ledger.get_user(first.user_id).await?.points;
        let second = harness.ledger.get_user(second.user_id).await?.points;
        let total = first + second;
        assert_that!(total).is_equal_to(dec!(900.00));

        Ok(())
    }
}
