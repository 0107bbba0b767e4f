use super::statements_cache;
use crate::{
    config::DatabaseConfig,
    models::{
        Amount, ClientId, Receipt, Statement, Transaction, TransactionCategory, TransactionId,
        TransactionStatus,
    },
    persistence::{Error, Repository as RepositoryTrait},
    telemetry,
};
use axum::async_trait;
use bb8_postgres::{
    bb8::{self, Pool, PooledConnection},
    tokio_postgres::{self},
};
use chrono::{DateTime, Utc};
use std::str::FromStr;

const SCHEMA: &str = include_str!("../../../../db/schema.sql");

type Manager = statements_cache::ConnectionManager<tokio_postgres::NoTls>;

#[derive(Clone)]
pub struct Repository {
    pool: Pool<Manager>,
}

impl Repository {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, Error> {
        let pg_config = tokio_postgres::Config::from_str(&config.url)?;

        // Pooled connections prepare statements against the store functions,
        // so the schema has to exist before the first connection is acquired.
        if config.migrate {
            migrate(&pg_config).await?;
        }

        let manager = statements_cache::ConnectionManager::new(pg_config, tokio_postgres::NoTls);

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(Some(config.pool_size.min(4)))
            .connection_customizer(Box::new(statements_cache::Cache))
            .connection_timeout(std::time::Duration::from_secs(5))
            .build(manager)
            .await?;

        Ok(Self { pool })
    }

    pub async fn connection(&self) -> Result<PooledConnection<'_, Manager>, Error> {
        let conn = self.pool.get().await?;
        Ok(conn)
    }
}

async fn migrate(config: &tokio_postgres::Config) -> Result<(), Error> {
    let (client, connection) = config.connect(tokio_postgres::NoTls).await?;

    tokio::spawn(async move {
        #[cfg_attr(not(feature = "telemetry"), allow(unused_variables))]
        if let Err(err) = connection.await {
            telemetry::error!("Migration connection error: {}", err);
        }
    });

    client.batch_execute(SCHEMA).await?;
    telemetry::info!("Database schema is up to date");

    Ok(())
}

#[async_trait]
impl RepositoryTrait for Repository {
    async fn create_client(&self, fullname: &str) -> Result<ClientId, Error> {
        let conn = self.connection().await?;

        let row = conn
            .query_one(
                conn.statements
                    .get(&statements_cache::Statement::CreateClient)
                    .ok_or(Error::Internal("Statement not found".into()))?,
                &[&fullname],
            )
            .await?;

        Ok(row.try_get("id")?)
    }

    async fn get_balance(&self, client_id: &ClientId) -> Result<f64, Error> {
        let conn = self.connection().await?;

        let row = conn
            .query_opt(
                conn.statements
                    .get(&statements_cache::Statement::GetBalance)
                    .ok_or(Error::Internal("Statement not found".into()))?,
                &[&client_id],
            )
            .await?
            .ok_or(Error::ClientNotFound)?;

        Ok(row.try_get("balance")?)
    }

    async fn get_statement(&self, client_id: &ClientId) -> Result<Statement, Error> {
        let conn = self.connection().await?;

        let rows = conn
            .query(
                conn.statements
                    .get(&statements_cache::Statement::GetStatement)
                    .ok_or(Error::Internal("Statement not found".into()))?,
                &[&client_id],
            )
            .await?;

        rows.try_into()
    }

    async fn deposit(&self, client_id: &ClientId, amount: &Amount) -> Result<Receipt, Error> {
        self.apply(statements_cache::Statement::Deposit, client_id, amount)
            .await
    }

    async fn withdraw(&self, client_id: &ClientId, amount: &Amount) -> Result<Receipt, Error> {
        self.apply(statements_cache::Statement::Withdraw, client_id, amount)
            .await
    }
}

impl Repository {
    async fn apply(
        &self,
        stmt: statements_cache::Statement,
        client_id: &ClientId,
        amount: &Amount,
    ) -> Result<Receipt, Error> {
        let conn = self.connection().await?;

        let row = conn
            .query_one(
                conn.statements
                    .get(&stmt)
                    .ok_or(Error::Internal("Statement not found".into()))?,
                &[&client_id, &amount.value()],
            )
            .await?;

        row.try_into()
    }
}

impl TryFrom<tokio_postgres::Row> for Receipt {
    type Error = Error;

    fn try_from(row: tokio_postgres::Row) -> Result<Self, Self::Error> {
        let result: i16 = row.try_get("result_code")?;

        match result {
            // 2 is a withdrawal refused for lack of funds; the attempt is
            // still recorded, with a FAILURE status.
            0 | 2 => Ok(Self {
                transaction: Transaction {
                    id: row.try_get("result_transaction_id")?,
                    amount: row.try_get("result_amount")?,
                    category: row.try_get("result_category")?,
                    status: row.try_get("result_status")?,
                    created_at: row.try_get("result_created_at")?,
                    client_id: row.try_get("result_client_id")?,
                },
                balance: row.try_get("result_balance")?,
            }),
            1 => Err(Error::ClientNotFound),
            _ => Err(Error::Internal("Unknown result code".into())),
        }
    }
}

impl TryFrom<Vec<tokio_postgres::Row>> for Statement {
    type Error = Error;

    fn try_from(rows: Vec<tokio_postgres::Row>) -> Result<Self, Self::Error> {
        let balance: f64 = rows
            .first()
            .ok_or(Error::ClientNotFound)?
            .try_get("balance")?;

        let mut transactions = Vec::with_capacity(rows.len());

        for row in rows {
            // A client without transactions yields a single row of NULLs.
            let Some(id) = row.try_get::<_, Option<TransactionId>>("id")? else {
                continue;
            };

            transactions.push(Transaction {
                id,
                amount: row.try_get("amount")?,
                category: row.try_get::<_, TransactionCategory>("category")?,
                status: row.try_get::<_, TransactionStatus>("status")?,
                created_at: row.try_get::<_, DateTime<Utc>>("created_at")?,
                client_id: row.try_get("client_id")?,
            });
        }

        Ok(Self {
            balance,
            transactions,
        })
    }
}

impl From<bb8::RunError<tokio_postgres::Error>> for Error {
    fn from(err: bb8::RunError<tokio_postgres::Error>) -> Self {
        telemetry::error!("Postgres error: {:?}", err);

        match err {
            bb8::RunError::User(e) => Self::Internal(e.to_string()),
            bb8::RunError::TimedOut => Self::Connection,
        }
    }
}

impl From<tokio_postgres::Error> for Error {
    fn from(err: tokio_postgres::Error) -> Self {
        telemetry::error!("Postgres error: {:?}", err);

        Self::Internal(err.to_string())
    }
}
