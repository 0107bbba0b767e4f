use std::sync::Arc;

use crate::{
    ledger::{self, Ledger},
    models::ClientId,
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::SimdJson;

/// `amount` is kept untyped so that a wrong type can be reported after the
/// client lookup rather than as a generic body rejection.
#[cfg_attr(test, derive(Debug, PartialEq))]
#[derive(Deserialize)]
pub struct Request {
    #[serde(default)]
    pub amount: serde_json::Value,
}

#[cfg_attr(test, derive(Debug, PartialEq))]
#[derive(Serialize)]
pub struct Response {
    pub message: &'static str,
}

pub async fn deposit(
    State(ledger): State<Arc<Ledger>>,
    Path(id): Path<ClientId>,
    SimdJson(payload): SimdJson<Request>,
) -> Result<Json<Response>, ledger::Error> {
    ledger.deposit(id, &payload.amount).await?;

    Ok(Json(Response {
        message: "Deposit completed.",
    }))
}

pub async fn withdraw(
    State(ledger): State<Arc<Ledger>>,
    Path(id): Path<ClientId>,
    SimdJson(payload): SimdJson<Request>,
) -> Result<Json<Response>, ledger::Error> {
    ledger.withdraw(id, &payload.amount).await?;

    Ok(Json(Response {
        message: "Withdraw completed.",
    }))
}
