use std::{collections::BTreeMap, ops::Deref};

use axum::async_trait;
use bb8_postgres::{
    bb8::{self, CustomizeConnection},
    tokio_postgres, PostgresConnectionManager,
};

#[derive(Ord, PartialOrd, Eq, PartialEq)]
pub enum Statement {
    CreateClient,
    Deposit,
    Withdraw,
    GetBalance,
    GetStatement,
}

#[derive(Debug)]
pub struct Cache;

#[async_trait]
impl CustomizeConnection<Connection, tokio_postgres::Error> for Cache {
    async fn on_acquire(&self, conn: &mut Connection) -> Result<(), tokio_postgres::Error> {
        conn.statements.insert(
            Statement::CreateClient,
            conn.prepare("INSERT INTO clients (fullname) VALUES ($1) RETURNING id;")
                .await?,
        );

        conn.statements.insert(
            Statement::Deposit,
            conn.prepare("SELECT * FROM deposit_funds($1, $2);").await?,
        );

        conn.statements.insert(
            Statement::Withdraw,
            conn.prepare("SELECT * FROM withdraw_funds($1, $2);").await?,
        );

        conn.statements.insert(
            Statement::GetBalance,
            conn.prepare("SELECT balance FROM clients WHERE id = $1;")
                .await?,
        );

        conn.statements.insert(
            Statement::GetStatement,
            conn.prepare(
                r#"
                    SELECT
                        c.id AS client_id,
                        c.balance,
                        t.id,
                        t.amount,
                        t.category,
                        t.status,
                        t.created_at
                    FROM
                        clients c
                    LEFT JOIN (
                        SELECT
                            id,
                            client_id,
                            amount,
                            category,
                            status,
                            created_at
                        FROM
                            transactions
                        WHERE
                            client_id = $1
                        ORDER BY
                            id DESC
                        LIMIT 10
                    ) AS t ON c.id = t.client_id
                    WHERE
                        c.id = $1
                    ORDER BY
                        t.id DESC;
                "#,
            )
            .await?,
        );

        Ok(())
    }
}

pub struct Connection {
    inner: tokio_postgres::Client,
    pub statements: BTreeMap<Statement, tokio_postgres::Statement>,
}

impl Connection {
    fn new(inner: tokio_postgres::Client) -> Self {
        Self {
            inner,
            statements: Default::default(),
        }
    }
}

impl Deref for Connection {
    type Target = tokio_postgres::Client;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub struct ConnectionManager<Tls>
where
    Tls: tokio_postgres::tls::MakeTlsConnect<tokio_postgres::Socket>,
{
    inner: PostgresConnectionManager<Tls>,
}

impl<Tls> ConnectionManager<Tls>
where
    Tls: tokio_postgres::tls::MakeTlsConnect<tokio_postgres::Socket>,
{
    pub fn new(config: tokio_postgres::Config, tls: Tls) -> Self {
        Self {
            inner: PostgresConnectionManager::new(config, tls),
        }
    }
}

#[async_trait]
impl<Tls> bb8::ManageConnection for ConnectionManager<Tls>
where
    Tls: tokio_postgres::tls::MakeTlsConnect<tokio_postgres::Socket> + Clone + Send + Sync + 'static,
    <Tls as tokio_postgres::tls::MakeTlsConnect<tokio_postgres::Socket>>::Stream: Send + Sync,
    <Tls as tokio_postgres::tls::MakeTlsConnect<tokio_postgres::Socket>>::TlsConnect: Send,
    <<Tls as tokio_postgres::tls::MakeTlsConnect<tokio_postgres::Socket>>::TlsConnect as tokio_postgres::tls::TlsConnect<tokio_postgres::Socket>>::Future: Send,
{
    type Connection = Connection;
    type Error = tokio_postgres::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let conn = self.inner.connect().await?;
        Ok(Connection::new(conn))
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.simple_query("").await.map(|_| ())
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        self.inner.has_broken(&mut conn.inner)
    }
}
