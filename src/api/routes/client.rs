use std::sync::Arc;

use crate::{
    ledger::{self, Ledger},
    models::{self, round_cents, ClientId},
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::SimdJson;

#[cfg_attr(test, derive(Debug, PartialEq))]
#[derive(Deserialize)]
pub struct CreateRequest {
    #[serde(default)]
    pub fullname: serde_json::Value,
}

#[derive(Serialize)]
pub struct CreateResponse {
    pub client_id: ClientId,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub balance: f64,
}

pub async fn create(
    State(ledger): State<Arc<Ledger>>,
    SimdJson(payload): SimdJson<CreateRequest>,
) -> Result<Json<CreateResponse>, ledger::Error> {
    let client_id = ledger.create_client(&payload.fullname).await?;

    Ok(Json(CreateResponse { client_id }))
}

pub async fn show(
    State(ledger): State<Arc<Ledger>>,
    Path(id): Path<ClientId>,
) -> Result<Json<BalanceResponse>, ledger::Error> {
    let balance = ledger.balance(id).await?;

    Ok(Json(BalanceResponse {
        balance: round_cents(balance),
    }))
}

pub async fn statement(
    State(ledger): State<Arc<Ledger>>,
    Path(id): Path<ClientId>,
) -> Result<Json<models::Statement>, ledger::Error> {
    Ok(Json(ledger.statement(id).await?))
}
