use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::UserId,
    ports::{
        capacity::CapacityPort, database::DatabasePort, ledger::LedgerPort, session::SessionPort,
    },
};
use rust_decimal::Decimal;
use serde::Serialize;
use tower::Service;
use tracing::Instrument;

use super::{DomainLogic, Error};

/// Charge a user for an API request
pub struct ChargeRequest {
    pub user_id: UserId,
    pub kind: RequestKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Standard,
    /// Hotel endpoints cost more
    Hotel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChargeResponse {
    /// Whether the points were taken
    ///
    /// A balance that is positive but below the charge lets the request through for free.
    pub charged: bool,
    pub amount: Decimal,
    pub remaining_points: Decimal,
}

impl<D, C, L, S> Service<ChargeRequest> for DomainLogic<D, C, L, S>
where
    D: DatabasePort + 'static,
    C: CapacityPort + 'static,
    L: LedgerPort + 'static,
    S: SessionPort + 'static,
{
    type Response = ChargeResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ChargeRequest) -> Self::Future {
        let logic = self.clone();
        let span = tracing::debug_span!("charge_request", user_id = %req.user_id, kind = ?req.kind);
        Box::pin(async move { logic.charge_request(req).await }.instrument(span))
    }
}

impl<D, C, L, S> DomainLogic<D, C, L, S>
where
    D: DatabasePort,
    C: CapacityPort,
    L: LedgerPort,
    S: SessionPort,
{
    async fn charge_request(&self, req: ChargeRequest) -> Result<ChargeResponse, Error> {
        let amount = match req.kind {
            RequestKind::Standard => self.config.request_charge,
            RequestKind::Hotel => self.config.hotel_request_charge,
        };

        let user = self.ledger.get_user(req.user_id).await?;
        if user.points <= Decimal::ZERO {
            return Err(Error::InsufficientPoints {
                required: amount,
                available: user.points,
            });
        }

        let res = match self.ledger.debit(user.user_id, amount).await? {
            Some(debit) => {
                self.revoke_if_depleted(user.user_id, &debit).await;
                ChargeResponse {
                    charged: true,
                    amount,
                    remaining_points: debit.balance,
                }
            }
            None => ChargeResponse {
                charged: false,
                amount,
                remaining_points: user.points,
            },
        };

        Ok(res)
    }
}
