use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    commands::{DomainLogic, Error},
    domain::UserId,
    ports::{
        capacity::CapacityPort, database::DatabasePort, ledger::LedgerPort, session::SessionPort,
    },
};
use rust_decimal::Decimal;
use tower::Service;

pub struct UserPointsRequest {
    pub user_id: UserId,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct UserPointsResponse {
    pub user_id: UserId,
    pub username: String,
    pub points: Decimal,
}

impl<D, C, L, S> Service<UserPointsRequest> for DomainLogic<D, C, L, S>
where
    D: DatabasePort + 'static,
    C: CapacityPort + 'static,
    L: LedgerPort + 'static,
    S: SessionPort + 'static,
{
    type Response = UserPointsResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: UserPointsRequest) -> Self::Future {
        let ledger = self.ledger.clone();
        Box::pin(async move {
            let user = ledger.get_user(req.user_id).await?;

            Ok::<_, Error>(UserPointsResponse {
                user_id: user.user_id,
                username: user.username,
                points: user.points,
            })
        })
    }
}
