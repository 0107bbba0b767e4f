//! Human-readable transaction notifications, one durable queue per client.

pub mod amqp;

use std::fmt;

use axum::async_trait;

use crate::models::{ClientId, Transaction};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("timed out acquiring a broker channel")]
    Connection,
    #[error("broker error: {0}")]
    Broker(String),
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, notification: &Notification) -> Result<(), Error>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    transaction: Transaction,
}

impl Notification {
    /// Queue the message is routed to. Every client has its own.
    pub fn queue(&self) -> String {
        self.client_id().to_string()
    }

    pub fn client_id(&self) -> ClientId {
        self.transaction.client_id
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }
}

impl From<&Transaction> for Notification {
    fn from(transaction: &Transaction) -> Self {
        Self {
            transaction: transaction.clone(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.transaction;

        // `{:?}` keeps the fractional part of whole amounts: `100.0`.
        write!(
            f,
            "[INFO] Transaction #{}:\n* amount: {:?}\n* client_id: {}\n* category: {}\n* status: {}",
            t.id, t.amount, t.client_id, t.category, t.status
        )
    }
}
