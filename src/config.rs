use std::{fmt::Display, str::FromStr};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid value for {name}: {value:?} ({reason})")]
pub struct Error {
    name: &'static str,
    value: String,
    reason: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub port: u16,
    pub database: DatabaseConfig,
    pub broker: BrokerConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseConfig {
    /// Either a libpq key/value string or a `postgres://` url.
    pub url: String,
    pub pool_size: u32,
    pub migrate: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub heartbeat: u16,
    pub pool_size: u32,
}

impl BrokerConfig {
    pub fn uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/%2f?heartbeat={}",
            self.user, self.password, self.host, self.port, self.heartbeat
        )
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let string = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());

        Ok(Self {
            port: parse(&lookup, "PORT", 3000)?,
            database: DatabaseConfig {
                url: string(
                    "DATABASE_URL",
                    "host=localhost user=admin password=123 dbname=ledger",
                ),
                pool_size: parse(&lookup, "DB_POOL_SIZE", 20)?,
                migrate: parse(&lookup, "DB_MIGRATE", true)?,
            },
            broker: BrokerConfig {
                host: string("RMQ_HOST", "localhost"),
                port: parse(&lookup, "RMQ_PORT", 5672)?,
                user: string("RMQ_USER", "guest"),
                password: string("RMQ_PASSWORD", "guest"),
                heartbeat: parse(&lookup, "RMQ_HEARTBEAT", 600)?,
                pool_size: parse(&lookup, "RMQ_POOL_SIZE", 8)?,
            },
        })
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, Error>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|err: T::Err| Error {
            name,
            reason: err.to_string(),
            value,
        }),
        None => Ok(default),
    }
}
