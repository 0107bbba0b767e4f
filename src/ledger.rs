//! Deposit and withdraw orchestration: validates input, applies the change
//! through the [`Repository`] and notifies the client through the
//! [`Publisher`].

use std::sync::Arc;

use crate::{
    models::{Amount, AmountError, ClientId, Receipt, Statement, Transaction, TransactionStatus},
    notification::{Notification, Publisher},
    persistence::{self, Repository},
    telemetry,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Client is not found.")]
    ClientNotFound,
    #[error("Invalid amount type.")]
    InvalidAmountType,
    #[error("Invalid amount value.")]
    InvalidAmountValue,
    #[error("Insufficient funds to withdraw.")]
    InsufficientFunds,
    #[error("Invalid fullname type.")]
    InvalidFullnameType,
    #[error("Fullname must not be blank.")]
    BlankFullname,
    #[error("Withdrawal #{0} was left in progress.")]
    Unsettled(i32),
    #[error(transparent)]
    Persistence(persistence::Error),
}

impl From<persistence::Error> for Error {
    fn from(err: persistence::Error) -> Self {
        match err {
            persistence::Error::ClientNotFound => Self::ClientNotFound,
            err => Self::Persistence(err),
        }
    }
}

impl From<AmountError> for Error {
    fn from(err: AmountError) -> Self {
        match err {
            AmountError::NotANumber => Self::InvalidAmountType,
            AmountError::NotPositive => Self::InvalidAmountValue,
        }
    }
}

pub struct Ledger {
    repo: Arc<dyn Repository>,
    publisher: Arc<dyn Publisher>,
}

impl Ledger {
    pub fn new(repo: Arc<dyn Repository>, publisher: Arc<dyn Publisher>) -> Self {
        Self { repo, publisher }
    }

    pub async fn create_client(&self, fullname: &serde_json::Value) -> Result<ClientId, Error> {
        let fullname = fullname.as_str().ok_or(Error::InvalidFullnameType)?;

        if fullname.trim().is_empty() {
            return Err(Error::BlankFullname);
        }

        let id = self.repo.create_client(fullname).await?;
        telemetry::info!("Created client {}", id);

        Ok(id)
    }

    pub async fn balance(&self, client_id: ClientId) -> Result<f64, Error> {
        Ok(self.repo.get_balance(&client_id).await?)
    }

    pub async fn statement(&self, client_id: ClientId) -> Result<Statement, Error> {
        Ok(self.repo.get_statement(&client_id).await?)
    }

    /// Credits `amount` to the client. Deposits cannot fail once the input is
    /// valid, so the transaction is written directly as `SUCCESS`.
    pub async fn deposit(
        &self,
        client_id: ClientId,
        amount: &serde_json::Value,
    ) -> Result<Receipt, Error> {
        let amount = self.amount(client_id, amount, false).await?;
        let receipt = self.repo.deposit(&client_id, &amount).await?;

        self.notify(&receipt.transaction).await;

        Ok(receipt)
    }

    /// Debits `amount`, rounded to cents, from the client. The attempt is
    /// recorded even when the balance does not cover it; in that case the
    /// transaction is marked `FAILURE` and `InsufficientFunds` is returned.
    pub async fn withdraw(
        &self,
        client_id: ClientId,
        amount: &serde_json::Value,
    ) -> Result<Receipt, Error> {
        let amount = self.amount(client_id, amount, true).await?;
        let receipt = self.repo.withdraw(&client_id, &amount).await?;

        self.notify(&receipt.transaction).await;

        match receipt.transaction.status {
            TransactionStatus::Success => Ok(receipt),
            TransactionStatus::Failure => {
                telemetry::info!(
                    "Withdrawal #{} refused: balance {} below {}",
                    receipt.transaction.id,
                    receipt.balance,
                    amount.value()
                );

                Err(Error::InsufficientFunds)
            }
            TransactionStatus::InProgress => Err(Error::Unsettled(receipt.transaction.id)),
        }
    }

    /// Parses the requested amount, rounding it to cents when `round` is set.
    /// An unknown client takes precedence over a malformed amount, so the
    /// client is looked up before reporting the latter.
    async fn amount(
        &self,
        client_id: ClientId,
        value: &serde_json::Value,
        round: bool,
    ) -> Result<Amount, Error> {
        let amount = Amount::try_from(value).and_then(|amount| match round {
            true => amount.rounded(),
            false => Ok(amount),
        });

        match amount {
            Ok(amount) => Ok(amount),
            Err(err) => {
                self.repo.get_balance(&client_id).await?;
                Err(err.into())
            }
        }
    }

    async fn notify(&self, transaction: &Transaction) {
        let notification = Notification::from(transaction);

        #[cfg_attr(not(feature = "telemetry"), allow(unused_variables))]
        if let Err(err) = self.publisher.publish(&notification).await {
            telemetry::error!(
                "Failed to publish notification for transaction #{}: {}",
                transaction.id,
                err
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        models::TransactionCategory,
        notification::recording::RecordingPublisher,
        persistence::memory::InMemoryRepository,
    };
    use rstest::rstest;
    use serde_json::json;

    fn ledger(
        repo: &Arc<InMemoryRepository>,
        publisher: &Arc<RecordingPublisher>,
    ) -> Ledger {
        Ledger::new(repo.clone(), publisher.clone())
    }

    fn setup(balance: f64) -> (Arc<InMemoryRepository>, Arc<RecordingPublisher>, ClientId) {
        let (repo, id) = InMemoryRepository::with_client("Ada Lovelace", balance);
        (Arc::new(repo), Arc::new(RecordingPublisher::default()), id)
    }

    #[rstest]
    #[case::integer(100.0, json!(25), 125.0)]
    #[case::float(0.0, json!(10.5), 10.5)]
    #[tokio::test]
    async fn test_deposit(
        #[case] balance: f64,
        #[case] amount: serde_json::Value,
        #[case] expected_balance: f64,
    ) {
        let (repo, publisher, id) = setup(balance);

        let receipt = ledger(&repo, &publisher).deposit(id, &amount).await.unwrap();

        assert_eq!(receipt.balance, expected_balance);
        assert_eq!(repo.client(id).unwrap().balance, expected_balance);

        let transactions = repo.transactions(id);
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].category, TransactionCategory::Deposit);
        assert_eq!(transactions[0].status, TransactionStatus::Success);

        let published = publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].transaction(), &transactions[0]);
    }

    #[rstest]
    #[case::partial(100.0, json!(40), 60.0)]
    #[case::whole_balance(100.0, json!(100), 0.0)]
    #[case::rounded(10.0, json!(2.499), 7.5)]
    #[tokio::test]
    async fn test_withdraw(
        #[case] balance: f64,
        #[case] amount: serde_json::Value,
        #[case] expected_balance: f64,
    ) {
        let (repo, publisher, id) = setup(balance);

        let receipt = ledger(&repo, &publisher).withdraw(id, &amount).await.unwrap();

        assert_eq!(receipt.balance, expected_balance);
        assert_eq!(repo.client(id).unwrap().balance, expected_balance);

        let transactions = repo.transactions(id);
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].category, TransactionCategory::Withdraw);
        assert_eq!(transactions[0].status, TransactionStatus::Success);
        assert_eq!(publisher.published().len(), 1);
    }

    #[tokio::test]
    async fn test_withdraw_insufficient_funds() {
        let (repo, publisher, id) = setup(100.0);

        let err = ledger(&repo, &publisher)
            .withdraw(id, &json!(150))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InsufficientFunds));
        assert_eq!(err.to_string(), "Insufficient funds to withdraw.");
        assert_eq!(repo.client(id).unwrap().balance, 100.0);

        let transactions = repo.transactions(id);
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount, 150.0);
        assert_eq!(transactions[0].status, TransactionStatus::Failure);

        let published = publisher.published();
        assert_eq!(published.len(), 1);
        assert!(published[0].to_string().ends_with("* status: FAILURE"));
    }

    #[rstest]
    #[case::deposit(true)]
    #[case::withdraw(false)]
    #[tokio::test]
    async fn test_unknown_client(#[case] deposit: bool) {
        let (repo, publisher, _) = setup(100.0);
        let ledger = ledger(&repo, &publisher);

        for amount in [json!(10), json!("ten")] {
            let result = match deposit {
                true => ledger.deposit(99, &amount).await,
                false => ledger.withdraw(99, &amount).await,
            };

            assert!(matches!(result, Err(Error::ClientNotFound)));
        }

        assert!(repo.transactions(99).is_empty());
        assert!(publisher.published().is_empty());
    }

    #[rstest]
    #[case::string(json!("10"), "Invalid amount type.")]
    #[case::missing(json!(null), "Invalid amount type.")]
    #[case::negative(json!(-10), "Invalid amount value.")]
    #[tokio::test]
    async fn test_invalid_amount(#[case] amount: serde_json::Value, #[case] message: &str) {
        let (repo, publisher, id) = setup(100.0);
        let ledger = ledger(&repo, &publisher);

        let deposit = ledger.deposit(id, &amount).await.unwrap_err();
        let withdraw = ledger.withdraw(id, &amount).await.unwrap_err();

        assert_eq!(deposit.to_string(), message);
        assert_eq!(withdraw.to_string(), message);
        assert_eq!(repo.client(id).unwrap().balance, 100.0);
        assert!(repo.transactions(id).is_empty());
    }

    #[rstest]
    #[case::rounds_to_zero(json!(0.001), "Invalid amount value.")]
    #[case::rounds_to_zero_below_half_cent(json!(0.004), "Invalid amount value.")]
    #[tokio::test]
    async fn test_withdraw_amount_rounded_away(
        #[case] amount: serde_json::Value,
        #[case] message: &str,
    ) {
        let (repo, publisher, id) = setup(100.0);
        let ledger = ledger(&repo, &publisher);

        let err = ledger.withdraw(id, &amount).await.unwrap_err();

        assert!(matches!(err, Error::InvalidAmountValue));
        assert_eq!(err.to_string(), message);
        assert_eq!(repo.client(id).unwrap().balance, 100.0);
        assert!(repo.transactions(id).is_empty());
        assert!(publisher.published().is_empty());

        // Unknown clients still take precedence.
        assert!(matches!(
            ledger.withdraw(99, &amount).await,
            Err(Error::ClientNotFound)
        ));
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_ledger_effects() {
        let (repo, _, id) = setup(0.0);
        let ledger = Ledger::new(repo.clone(), Arc::new(RecordingPublisher::failing()));

        ledger.deposit(id, &json!(30)).await.unwrap();
        ledger.withdraw(id, &json!(10)).await.unwrap();

        assert_eq!(repo.client(id).unwrap().balance, 20.0);
        assert_eq!(repo.transactions(id).len(), 2);
    }

    #[tokio::test]
    async fn test_balance_matches_successful_transactions() {
        let (repo, publisher, id) = setup(0.0);
        let ledger = ledger(&repo, &publisher);

        ledger.deposit(id, &json!(50)).await.unwrap();
        ledger.withdraw(id, &json!(80)).await.unwrap_err();
        ledger.withdraw(id, &json!(20)).await.unwrap();
        ledger.deposit(id, &json!(5.5)).await.unwrap();

        let expected: f64 = repo
            .transactions(id)
            .iter()
            .filter(|t| t.status == TransactionStatus::Success)
            .map(|t| match t.category {
                TransactionCategory::Deposit => t.amount,
                TransactionCategory::Withdraw => -t.amount,
            })
            .sum();

        assert_eq!(ledger.balance(id).await.unwrap(), expected);
        assert_eq!(expected, 35.5);
    }

    #[rstest]
    #[case::valid(json!("Grace Hopper"), Ok(()))]
    #[case::number(json!(42), Err("Invalid fullname type."))]
    #[case::missing(json!(null), Err("Invalid fullname type."))]
    #[case::blank(json!("  "), Err("Fullname must not be blank."))]
    #[tokio::test]
    async fn test_create_client(
        #[case] fullname: serde_json::Value,
        #[case] expected: Result<(), &str>,
    ) {
        let repo = Arc::new(InMemoryRepository::default());
        let publisher = Arc::new(RecordingPublisher::default());

        let result = ledger(&repo, &publisher).create_client(&fullname).await;

        match expected {
            Ok(()) => {
                let id = result.unwrap();
                assert_eq!(repo.client(id).unwrap().balance, 0.0);
                assert_eq!(repo.client(id).unwrap().fullname, "Grace Hopper");
            }
            Err(message) => assert_eq!(result.unwrap_err().to_string(), message),
        }
    }

    #[tokio::test]
    async fn test_statement_lists_newest_first() {
        let (repo, publisher, id) = setup(0.0);
        let ledger = ledger(&repo, &publisher);

        for amount in 1..=12 {
            ledger.deposit(id, &json!(amount)).await.unwrap();
        }

        let statement = ledger.statement(id).await.unwrap();

        assert_eq!(statement.balance, 78.0);
        assert_eq!(statement.transactions.len(), 10);
        assert_eq!(statement.transactions[0].amount, 12.0);
        assert_eq!(statement.transactions[9].amount, 3.0);
    }
}
