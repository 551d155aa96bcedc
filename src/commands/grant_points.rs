use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::UserId,
    ports::{
        capacity::CapacityPort,
        database::DatabasePort,
        ledger::{self, LedgerPort},
        session::SessionPort,
    },
};
use rust_decimal::Decimal;
use serde::Serialize;
use tower::Service;
use tracing::Instrument;

use super::{DomainLogic, Error};

/// Administrative adjustment of a user's balance
pub struct GrantPointsRequest {
    pub admin_id: UserId,
    pub user_id: UserId,
    /// Points to add; a negative amount removes points
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GrantPointsResponse {
    pub user_id: UserId,
    /// Previous number of points
    pub old_points: Decimal,
    /// New number of points
    pub new_points: Decimal,
}

impl<D, C, L, S> Service<GrantPointsRequest> for DomainLogic<D, C, L, S>
where
    D: DatabasePort + 'static,
    C: CapacityPort + 'static,
    L: LedgerPort + 'static,
    S: SessionPort + 'static,
{
    type Response = GrantPointsResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: GrantPointsRequest) -> Self::Future {
        let logic = self.clone();
        let span = tracing::info_span!(
            "grant_points",
            admin_id = %req.admin_id,
            user_id = %req.user_id,
            amount = %req.amount,
        );
        Box::pin(async move { logic.grant_points(req).await }.instrument(span))
    }
}

impl<D, C, L, S> DomainLogic<D, C, L, S>
where
    D: DatabasePort,
    C: CapacityPort,
    L: LedgerPort,
    S: SessionPort,
{
    async fn grant_points(&self, req: GrantPointsRequest) -> Result<GrantPointsResponse, Error> {
        // Unknown callers have no capability either
        match self.ledger.get_user(req.admin_id).await {
            Ok(admin) if admin.is_admin => {}
            Ok(_) | Err(ledger::Error::UserDoesNotExist(_)) => {
                tracing::warn!("caller is not an administrator");
                return Err(Error::Forbidden);
            }
            Err(err) => return Err(err.into()),
        }

        let new_points = if req.amount.is_sign_negative() {
            let amount = -req.amount;
            match self.ledger.debit(req.user_id, amount).await? {
                Some(debit) => {
                    self.revoke_if_depleted(req.user_id, &debit).await;
                    debit.balance
                }
                None => {
                    let user = self.ledger.get_user(req.user_id).await?;
                    return Err(Error::InsufficientPoints {
                        required: amount,
                        available: user.points,
                    });
                }
            }
        } else {
            self.ledger.credit(req.user_id, req.amount).await?
        };

        tracing::info!(%new_points, "points granted");

        Ok(GrantPointsResponse {
            user_id: req.user_id,
            old_points: new_points - req.amount,
            new_points,
        })
    }
}
