use super::event::{NotificationPublisher, QueueProvider};
use super::QueueError;
use async_trait::async_trait;

/// Factory for connected clients of the event log
///
/// A client bundles the capabilities to append to the log ([`NotificationPublisher`]) and
/// to subscribe to or replay it ([`QueueProvider`]). Creating a client establishes the
/// connection, so failing to build one is the canonical way to learn that the log is
/// unreachable. Clients are never shared implicitly; whoever calls [`connect`](LogClientFactory::connect)
/// owns the result and decides when to drop and rebuild it.
#[async_trait]
pub trait LogClientFactory: Send + Sync {
    /// Client type returned by the factory
    type Client: QueueProvider + NotificationPublisher + Send + Sync + 'static;

    /// Establishes a new connection to the log
    async fn connect(&self) -> Result<Self::Client, QueueError>;
}
