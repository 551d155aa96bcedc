use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    commands::{DomainLogic, Error},
    domain::{Booking, UserId},
    ports::{
        capacity::CapacityPort, database::DatabasePort, ledger::LedgerPort, session::SessionPort,
    },
};
use tower::Service;

/// All bookings made by a user, cancelled ones included
pub struct BookingHistoryRequest {
    pub user_id: UserId,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct BookingHistoryResponse {
    /// Most recent first
    pub bookings: Vec<Booking>,
}

impl<D, C, L, S> Service<BookingHistoryRequest> for DomainLogic<D, C, L, S>
where
    D: DatabasePort + 'static,
    C: CapacityPort + 'static,
    L: LedgerPort + 'static,
    S: SessionPort + 'static,
{
    type Response = BookingHistoryResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: BookingHistoryRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let mut bookings = database.list_bookings(req.user_id).await?;
            bookings.sort_by(|a, b| {
                b.booking_date
                    .cmp(&a.booking_date)
                    .then_with(|| b.id.cmp(&a.id))
            });

            Ok::<_, Error>(BookingHistoryResponse { bookings })
        })
    }
}
