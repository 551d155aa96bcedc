use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    commands::{DomainLogic, Error},
    domain::TourPackage,
    ports::{
        capacity::CapacityPort, database::DatabasePort, ledger::LedgerPort, session::SessionPort,
    },
};
use tower::Service;
use uuid::Uuid;

pub struct PackageDetailsRequest {
    /// Tracking id of the package
    pub package_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct PackageDetailsResponse {
    pub package: TourPackage,
    pub booked_seats: u32,
    pub available_seats: u32,
    /// Whether the package can still be booked today
    pub booking_open: bool,
}

impl<D, C, L, S> Service<PackageDetailsRequest> for DomainLogic<D, C, L, S>
where
    D: DatabasePort + 'static,
    C: CapacityPort + 'static,
    L: LedgerPort + 'static,
    S: SessionPort + 'static,
{
    type Response = PackageDetailsResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: PackageDetailsRequest) -> Self::Future {
        let database = self.database.clone();
        let capacity = self.capacity.clone();
        let now = self.clock.now();
        Box::pin(async move {
            let package = database.get_package(req.package_id).await?;
            let booked_seats = capacity.booked_seats(package.tracking_id).await?;

            Ok::<_, Error>(PackageDetailsResponse {
                available_seats: package.capacity.saturating_sub(booked_seats),
                booking_open: package.booking_open(now),
                booked_seats,
                package,
            })
        })
    }
}
