mod client;
mod transaction;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;

pub use client::create as create_client;
pub use client::show as show_balance;
pub use client::statement as show_statement;
pub use transaction::deposit;
pub use transaction::withdraw;

use crate::{ledger, telemetry};

pub async fn index() -> &'static str {
    "Transaction service API"
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": status.canonical_reason().unwrap_or("Unknown error"),
            "message": message.into(),
        })),
    )
        .into_response()
}

impl From<&ledger::Error> for StatusCode {
    fn from(err: &ledger::Error) -> Self {
        match err {
            ledger::Error::ClientNotFound => StatusCode::NOT_FOUND,
            ledger::Error::InvalidAmountType
            | ledger::Error::InvalidAmountValue
            | ledger::Error::InsufficientFunds
            | ledger::Error::InvalidFullnameType
            | ledger::Error::BlankFullname => StatusCode::BAD_REQUEST,
            ledger::Error::Unsettled(_) | ledger::Error::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ledger::Error {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);

        match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                telemetry::error!("Request failed: {}", self);

                json_error(status, "Internal server error.")
            }
            _ => json_error(status, self.to_string()),
        }
    }
}

/// JSON body parsed with simd-json. Any body that is not valid JSON for `T`
/// is rejected with 400.
pub struct SimdJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for SimdJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let mut body = bytes.to_vec();

        simd_json::serde::from_slice::<T>(&mut body)
            .map(Self)
            .map_err(
                #[cfg_attr(not(feature = "telemetry"), allow(unused_variables))]
                |e| {
                    telemetry::error!("Failed to deserialize request JSON: {}", e);

                    json_error(StatusCode::BAD_REQUEST, "Invalid request body.")
                },
            )
    }
}
