use super::super::super::{LogClientFactory, QueueError};
use super::super::json::JsonNotificationPublisher;
use async_trait::async_trait;
use redis::aio::{Connection, MultiplexedConnection};
use redis::Client;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument};

/// [`LogClientFactory`] implementation connecting to a redis server
#[derive(Debug, Clone)]
pub struct RedisLogFactory {
    url: String,
    connect_timeout: Duration,
}

impl RedisLogFactory {
    /// Creates a new factory opening connections to the given URL
    ///
    /// Attempts to connect are abandoned after `connect_timeout` so that an unreachable
    /// server is reported instead of waited for.
    pub fn new(url: String, connect_timeout: Duration) -> Self {
        Self {
            url,
            connect_timeout,
        }
    }
}

#[async_trait]
impl LogClientFactory for RedisLogFactory {
    type Client = RedisLogClient;

    #[instrument(skip(self), fields(url = %self.url))]
    async fn connect(&self) -> Result<Self::Client, QueueError> {
        debug!("Connecting to redis");

        let client = Client::open(self.url.as_str())?;
        let shared = timeout(self.connect_timeout, client.get_multiplexed_tokio_connection())
            .await
            .map_err(|_| timeout_error(self.connect_timeout))??;

        Ok(RedisLogClient {
            client,
            shared,
            connect_timeout: self.connect_timeout,
        })
    }
}

/// Connected client of a redis based event log
///
/// Appends and acknowledgements are sent through a shared, multiplexed connection.
/// Each subscription or replay opens a dedicated connection as reading blocks it.
pub struct RedisLogClient {
    client: Client,
    pub(super) shared: MultiplexedConnection,
    connect_timeout: Duration,
}

impl RedisLogClient {
    /// Opens a connection which is not shared with anybody else and may thus be used for blocking commands
    pub(super) async fn owned_connection(&self) -> Result<Connection, QueueError> {
        let connection = timeout(self.connect_timeout, self.client.get_async_connection())
            .await
            .map_err(|_| timeout_error(self.connect_timeout))??;

        Ok(connection)
    }
}

impl JsonNotificationPublisher for RedisLogClient {}

fn timeout_error(duration: Duration) -> QueueError {
    QueueError::Unavailable(format!(
        "timed out connecting to redis after {}s",
        duration.as_secs_f32()
    ))
}
