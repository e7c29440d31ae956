use super::super::QueueError;
use super::{EntryIdentifier, QueueDescriptor};
use async_trait::async_trait;
use serde::Serialize;

/// Structure which allows publishing of serialized data into a queue
#[async_trait]
pub trait RawNotificationPublisher {
    /// Appends an opaque payload to a [`Queue`](QueueDescriptor) and waits for the log to acknowledge the write
    async fn publish_raw(
        &self,
        data: &[u8],
        descriptor: &QueueDescriptor,
    ) -> Result<EntryIdentifier, QueueError>;
}

/// Publisher for serializable notifications
#[async_trait]
pub trait NotificationPublisher {
    /// Publishes a notification to the given queue
    async fn publish<N: Serialize + Send + Sync>(
        &self,
        notification: &N,
        descriptor: &QueueDescriptor,
    ) -> Result<EntryIdentifier, QueueError>;
}
