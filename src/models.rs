use chrono::{DateTime, Utc};
use postgres_types::{FromSql, ToSql};
use serde::Serialize;
use std::fmt;

pub type ClientId = i32;
pub type TransactionId = i32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSql, FromSql)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[postgres(name = "transaction_category")]
pub enum TransactionCategory {
    #[postgres(name = "DEPOSIT")]
    Deposit,
    #[postgres(name = "WITHDRAW")]
    Withdraw,
}

impl TransactionCategory {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdraw => "WITHDRAW",
        }
    }
}

impl fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle of a transaction. Withdrawals start `InProgress` and end in
/// either terminal state; deposits are written as `Success` directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSql, FromSql)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[postgres(name = "transaction_status")]
pub enum TransactionStatus {
    #[postgres(name = "IN_PROGRESS")]
    InProgress,
    #[postgres(name = "SUCCESS")]
    Success,
    #[postgres(name = "FAILURE")]
    Failure,
}

impl TransactionStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub amount: f64,
    pub category: TransactionCategory,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub client_id: ClientId,
}

/// A transaction as written by a deposit or withdrawal, together with the
/// client's balance once the store function returned.
#[derive(Clone, Debug, PartialEq)]
pub struct Receipt {
    pub transaction: Transaction,
    pub balance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Statement {
    pub balance: f64,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AmountError {
    NotANumber,
    NotPositive,
}

/// A funds amount taken from a request body: a finite number greater than zero.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Amount(f64);

impl Amount {
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Rounds to cents. An amount too small to survive the rounding is
    /// rejected like any other non-positive amount.
    pub fn rounded(self) -> Result<Self, AmountError> {
        match round_cents(self.0) {
            amount if amount > 0.0 => Ok(Self(amount)),
            _ => Err(AmountError::NotPositive),
        }
    }
}

impl TryFrom<&serde_json::Value> for Amount {
    type Error = AmountError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        let amount = match value {
            serde_json::Value::Number(number) => number.as_f64().ok_or(AmountError::NotANumber)?,
            _ => return Err(AmountError::NotANumber),
        };

        if !amount.is_finite() || amount <= 0.0 {
            return Err(AmountError::NotPositive);
        }

        Ok(Self(amount))
    }
}

/// Rounds to two decimals, ties to even.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
