use crate::models::{Amount, ClientId, Receipt, Statement};
use axum::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("timed out acquiring a database connection")]
    Connection,
    #[error("database error: {0}")]
    Internal(String),
    #[error("client not found")]
    ClientNotFound,
}

/// Storage for clients and their transactions.
///
/// `deposit` and `withdraw` are atomic: the balance change and the
/// transaction record are committed together or not at all. A withdrawal
/// that exceeds the balance is not an error here; it is returned as a
/// receipt whose transaction has `Failure` status.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_client(&self, fullname: &str) -> Result<ClientId, Error>;

    async fn get_balance(&self, client_id: &ClientId) -> Result<f64, Error>;

    async fn get_statement(&self, client_id: &ClientId) -> Result<Statement, Error>;

    async fn deposit(&self, client_id: &ClientId, amount: &Amount) -> Result<Receipt, Error>;

    async fn withdraw(&self, client_id: &ClientId, amount: &Amount) -> Result<Receipt, Error>;
}
