use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::{refund::Refund, Booking, BookingStatus, TourPackage, UserId},
    ports::{
        capacity::CapacityPort,
        database::{self, DatabasePort},
        ledger::LedgerPort,
        session::SessionPort,
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tower::Service;
use tracing::Instrument;
use uuid::Uuid;

use super::{DomainLogic, Error, Resource};

pub struct CancelBookingRequest {
    pub user_id: UserId,
    /// Tracking id of the package
    pub package_id: Uuid,
    /// Tracking id of the booking
    pub booking_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum CancelBookingResponse {
    Cancelled(Cancellation),
    /// The booking was cancelled earlier; nothing changed
    AlreadyCancelled { booking: Booking },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Cancellation {
    /// The booking after cancellation, including its cancellation time
    pub booking: Booking,
    pub refund: Refund,
    /// Balance after the refund
    pub remaining_points: Decimal,
}

impl<D, C, L, S> Service<CancelBookingRequest> for DomainLogic<D, C, L, S>
where
    D: DatabasePort + 'static,
    C: CapacityPort + 'static,
    L: LedgerPort + 'static,
    S: SessionPort + 'static,
{
    type Response = CancelBookingResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CancelBookingRequest) -> Self::Future {
        let logic = self.clone();
        let span = tracing::info_span!(
            "cancel_booking",
            user_id = %req.user_id,
            package_id = %req.package_id,
            booking_id = %req.booking_id,
        );
        Box::pin(async move { logic.cancel_booking(req).await }.instrument(span))
    }
}

impl<D, C, L, S> DomainLogic<D, C, L, S>
where
    D: DatabasePort,
    C: CapacityPort,
    L: LedgerPort,
    S: SessionPort,
{
    async fn cancel_booking(
        &self,
        req: CancelBookingRequest,
    ) -> Result<CancelBookingResponse, Error> {
        let package = self.database.get_package(req.package_id).await?;
        let booking = self.database.get_booking(req.booking_id).await?;

        // Bookings of other users, or on another package, do not exist for the caller
        if booking.user_id != req.user_id || booking.package_id != package.tracking_id {
            return Err(Error::NotFound(Resource::Booking(req.booking_id)));
        }

        let lock = self.booking_lock(booking.tracking_id);
        let _guard = lock.lock().await;
        self.cancel_locked(&package, booking.tracking_id).await
    }

    /// Cancel a booking while holding its lock
    ///
    /// The status transition claims the booking before any refund is credited, so concurrent
    /// cancellations from other service instances refund at most once.
    async fn cancel_locked(
        &self,
        package: &TourPackage,
        booking_id: Uuid,
    ) -> Result<CancelBookingResponse, Error> {
        // Another cancellation may have finished while waiting for the lock
        let booking = self.database.get_booking(booking_id).await?;
        if booking.status == BookingStatus::Cancelled {
            tracing::info!("booking already cancelled");
            return Ok(CancelBookingResponse::AlreadyCancelled { booking });
        }

        let now = self.clock.now();
        if let Some(cutoff) = package.closed_since(now) {
            tracing::warn!(%cutoff, "cancellation window closed");
            return Err(Error::CancellationWindowClosed(cutoff));
        }

        let refund = Refund::compute(&booking, package, now);

        let cancelled = match self
            .database
            .transition_booking(booking_id, booking.status, BookingStatus::Cancelled, now)
            .await
        {
            Ok(cancelled) => cancelled,
            Err(database::Error::StatusConflict {
                actual: BookingStatus::Cancelled,
                ..
            }) => {
                tracing::info!("booking cancelled concurrently");
                let booking = self.database.get_booking(booking_id).await?;
                return Ok(CancelBookingResponse::AlreadyCancelled { booking });
            }
            Err(err) => return Err(err.into()),
        };

        let remaining_points = match self.ledger.credit(booking.user_id, refund.amount).await {
            Ok(balance) => balance,
            Err(err) => {
                tracing::error!(error = %err, "failed to credit refund, restoring booking");
                self.restore_status(booking_id, booking.status, now).await;
                return Err(err.into());
            }
        };

        // Seats are released once the booking is cancelled. If this fails the package keeps
        // them held, which can only under-sell it.
        match self
            .capacity
            .release(package.tracking_id, booking.num_travelers)
            .await
        {
            Ok(booked_seats) => tracing::debug!(booked_seats, "seats released"),
            Err(err) => tracing::error!(error = %err, "failed to release seats"),
        }

        tracing::info!(
            tier = ?refund.tier,
            refund = %refund.amount,
            %remaining_points,
            "booking cancelled"
        );

        Ok(CancelBookingResponse::Cancelled(Cancellation {
            booking: cancelled,
            refund,
            remaining_points,
        }))
    }

    /// Compensation: move a booking claimed for cancellation back to `status`
    async fn restore_status(&self, booking_id: Uuid, status: BookingStatus, now: DateTime<Utc>) {
        if let Err(err) = self
            .database
            .transition_booking(booking_id, BookingStatus::Cancelled, status, now)
            .await
        {
            tracing::error!(error = %err, %status, "failed to restore booking status");
        }
    }
}
