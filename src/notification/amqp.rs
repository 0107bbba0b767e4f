use std::time::Duration;

use axum::async_trait;
use bb8_postgres::bb8::{self, Pool};
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tokio::sync::Mutex;

use super::{Error, Notification, Publisher as PublisherTrait};
use crate::{config::BrokerConfig, telemetry};

/// AMQP `delivery_mode` for messages that survive a broker restart.
const PERSISTENT_DELIVERY: u8 = 2;

/// Every notification is written to disk by the broker, whatever its
/// category.
fn message_properties() -> BasicProperties {
    BasicProperties::default().with_delivery_mode(PERSISTENT_DELIVERY)
}

/// Hands out channels over a single broker connection, reconnecting when the
/// connection has dropped.
pub struct ChannelManager {
    uri: String,
    connection: Mutex<Option<Connection>>,
}

impl ChannelManager {
    pub fn new(uri: String) -> Self {
        Self {
            uri,
            connection: Mutex::new(None),
        }
    }
}

#[async_trait]
impl bb8::ManageConnection for ChannelManager {
    type Connection = Channel;
    type Error = lapin::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let mut connection = self.connection.lock().await;

        if let Some(conn) = connection.as_ref().filter(|c| c.status().connected()) {
            return conn.create_channel().await;
        }

        telemetry::info!("Connecting to message broker");

        let conn = Connection::connect(&self.uri, ConnectionProperties::default()).await?;
        let channel = conn.create_channel().await?;
        *connection = Some(conn);

        Ok(channel)
    }

    async fn is_valid(&self, channel: &mut Self::Connection) -> Result<(), Self::Error> {
        match channel.status().connected() {
            true => Ok(()),
            false => Err(lapin::Error::InvalidChannelState(channel.status().state())),
        }
    }

    fn has_broken(&self, channel: &mut Self::Connection) -> bool {
        !channel.status().connected()
    }
}

#[derive(Clone)]
pub struct Publisher {
    pool: Pool<ChannelManager>,
}

impl Publisher {
    pub async fn new(config: &BrokerConfig) -> Result<Self, Error> {
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(Some(1))
            .connection_timeout(Duration::from_secs(5))
            .build(ChannelManager::new(config.uri()))
            .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl PublisherTrait for Publisher {
    async fn publish(&self, notification: &Notification) -> Result<(), Error> {
        let channel = self.pool.get().await?;
        let queue = notification.queue();

        channel
            .queue_declare(
                &queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        channel
            .basic_publish(
                "",
                &queue,
                BasicPublishOptions::default(),
                notification.to_string().as_bytes(),
                message_properties(),
            )
            .await?
            .await?;

        telemetry::debug!(
            "Published notification for transaction #{} to queue {}",
            notification.transaction().id,
            queue
        );

        Ok(())
    }
}

impl From<bb8::RunError<lapin::Error>> for Error {
    fn from(err: bb8::RunError<lapin::Error>) -> Self {
        telemetry::error!("Broker error: {:?}", err);

        match err {
            bb8::RunError::User(e) => Self::Broker(e.to_string()),
            bb8::RunError::TimedOut => Self::Connection,
        }
    }
}

impl From<lapin::Error> for Error {
    fn from(err: lapin::Error) -> Self {
        telemetry::error!("Broker error: {:?}", err);

        Self::Broker(err.to_string())
    }
}
