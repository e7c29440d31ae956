//! Serialization and deserialization provided by [`serde_json`] using marker traits
//!
//! This module allows implementors of traits that allow raw access to underlying messaging systems
//! to provide the higher-level traits relying on serialization. It does so by providing a number of
//! marker traits which, when implemented, provide default implementations of the higher-level traits
//! by translating between lower-level serialized data and higher-level strongly typed data by using
//! [`serde_json`]. Payloads on the wire are thus UTF-8 encoded JSON text.

use super::super::event::{
    EntryIdentifier, NotificationPublisher, QueueDescriptor, QueueEntry, RawNotificationPublisher,
    RawQueueEntry, ReplayedEntry,
};
use super::super::QueueError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Marker trait providing a default [`NotificationPublisher`] implementation based on [`serde_json`]
pub trait JsonNotificationPublisher: RawNotificationPublisher + Send + Sync {}

#[async_trait]
impl<P> NotificationPublisher for P
where
    P: JsonNotificationPublisher,
{
    /// Serializes the notification using [`serde_json::to_vec`]
    async fn publish<N: Serialize + Send + Sync>(
        &self,
        notification: &N,
        descriptor: &QueueDescriptor,
    ) -> Result<EntryIdentifier, QueueError> {
        let data =
            serde_json::to_vec(notification).map_err(|e| QueueError::Malformed(e.to_string()))?;
        self.publish_raw(&data, descriptor).await
    }
}

/// Marker trait providing a default [`QueueEntry`] implementation based on [`serde_json`]
pub trait JsonQueueEntry: RawQueueEntry {}

impl<E> QueueEntry for E
where
    E: JsonQueueEntry,
{
    /// Parses the payload using [`serde_json::from_slice`]
    fn parse_payload<T>(&self) -> Result<T, QueueError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(self.payload()).map_err(|e| QueueError::Malformed(e.to_string()))
    }
}

impl JsonQueueEntry for ReplayedEntry {}
