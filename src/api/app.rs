use super::routes;
use crate::ledger::Ledger;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn new(ledger: Arc<Ledger>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/client", post(routes::create_client))
        .route("/client/:id", get(routes::show_balance))
        .route("/client/:id/transactions", get(routes::show_statement))
        .route("/client/:id/deposit", post(routes::deposit))
        .route("/client/:id/withdraw", post(routes::withdraw))
        .with_state(ledger)
}
