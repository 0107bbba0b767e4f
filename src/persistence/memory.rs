use std::{collections::BTreeMap, sync::Mutex};

use axum::async_trait;
use chrono::Utc;

use crate::{
    models::{
        Amount, ClientId, Receipt, Statement, Transaction, TransactionCategory, TransactionStatus,
    },
    persistence::{Error, Repository},
};

#[derive(Debug, Clone)]
pub struct Client {
    pub fullname: String,
    pub balance: f64,
}

#[derive(Default)]
struct State {
    clients: BTreeMap<ClientId, Client>,
    transactions: Vec<Transaction>,
}

/// Mirrors the semantics of the Postgres store functions without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
}

impl InMemoryRepository {
    pub fn with_client(fullname: &str, balance: f64) -> (Self, ClientId) {
        let repo = Self::default();
        let id = repo.insert_client(fullname, balance);
        (repo, id)
    }

    pub fn insert_client(&self, fullname: &str, balance: f64) -> ClientId {
        let mut state = self.state.lock().unwrap();
        let id = state.clients.len() as ClientId + 1;

        state.clients.insert(
            id,
            Client {
                fullname: fullname.into(),
                balance,
            },
        );

        id
    }

    pub fn client(&self, id: ClientId) -> Option<Client> {
        self.state.lock().unwrap().clients.get(&id).cloned()
    }

    pub fn transactions(&self, client_id: ClientId) -> Vec<Transaction> {
        self.state
            .lock()
            .unwrap()
            .transactions
            .iter()
            .filter(|t| t.client_id == client_id)
            .cloned()
            .collect()
    }

    fn record(
        state: &mut State,
        client_id: ClientId,
        amount: &Amount,
        category: TransactionCategory,
    ) -> usize {
        let id = state.transactions.len() as i32 + 1;

        state.transactions.push(Transaction {
            id,
            amount: amount.value(),
            category,
            status: TransactionStatus::InProgress,
            created_at: Utc::now(),
            client_id,
        });

        state.transactions.len() - 1
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_client(&self, fullname: &str) -> Result<ClientId, Error> {
        Ok(self.insert_client(fullname, 0.0))
    }

    async fn get_balance(&self, client_id: &ClientId) -> Result<f64, Error> {
        self.client(*client_id)
            .map(|c| c.balance)
            .ok_or(Error::ClientNotFound)
    }

    async fn get_statement(&self, client_id: &ClientId) -> Result<Statement, Error> {
        let balance = self.get_balance(client_id).await?;
        let mut transactions = self.transactions(*client_id);
        transactions.reverse();
        transactions.truncate(10);

        Ok(Statement {
            balance,
            transactions,
        })
    }

    async fn deposit(&self, client_id: &ClientId, amount: &Amount) -> Result<Receipt, Error> {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;

        let client = state
            .clients
            .get_mut(client_id)
            .ok_or(Error::ClientNotFound)?;
        client.balance += amount.value();
        let balance = client.balance;

        let index = Self::record(state, *client_id, amount, TransactionCategory::Deposit);
        state.transactions[index].status = TransactionStatus::Success;

        Ok(Receipt {
            transaction: state.transactions[index].clone(),
            balance,
        })
    }

    async fn withdraw(&self, client_id: &ClientId, amount: &Amount) -> Result<Receipt, Error> {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;

        if !state.clients.contains_key(client_id) {
            return Err(Error::ClientNotFound);
        }

        let index = Self::record(state, *client_id, amount, TransactionCategory::Withdraw);

        let client = state
            .clients
            .get_mut(client_id)
            .ok_or(Error::ClientNotFound)?;

        let status = if client.balance < amount.value() {
            TransactionStatus::Failure
        } else {
            client.balance -= amount.value();
            TransactionStatus::Success
        };
        let balance = client.balance;

        state.transactions[index].status = status;

        Ok(Receipt {
            transaction: state.transactions[index].clone(),
            balance,
        })
    }
}
