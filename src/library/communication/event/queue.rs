use super::super::QueueError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Describes a notification queue and its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDescriptor {
    key: String,
    limit: usize,
}

impl QueueDescriptor {
    /// Creates a new instance from raw parts
    pub fn new(key: String, limit: usize) -> Self {
        Self { key, limit }
    }

    /// Value which may be used by queue implementations to identify a queue
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Maximum number of notifications to be retained in the queue
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Location within the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueLocation {
    /// Start of the queue (not necessarily the first notification as a queue is limited in length)
    Head,
    /// End of the queue (exclusive of the last message)
    Tail,
}

/// Identifier assigned to an entry by the log when it was appended
pub type EntryIdentifier = String;

/// Entry retrieved from a [`Queue`](QueueDescriptor) providing a raw payload
#[async_trait]
pub trait RawQueueEntry {
    /// Identifier of the entry within the queue
    fn id(&self) -> &str;

    /// Payload of the item
    fn payload(&self) -> &[u8];

    /// Acknowledge the item as processed, advancing the cursor of the consumer group past it
    async fn acknowledge(&mut self) -> Result<(), QueueError>;
}

/// Useful functions for [`QueueEntry`] implementations with default implementations
pub trait QueueEntry: RawQueueEntry {
    /// Attempts to parse the wire-format payload into a given data structure
    fn parse_payload<T>(&self) -> Result<T, QueueError>
    where
        T: DeserializeOwned;
}

/// Entry read during a [replay](super::QueueProvider::replay)
///
/// Replays hold no cursor, thus acknowledging a replayed entry does nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayedEntry {
    id: EntryIdentifier,
    payload: Vec<u8>,
}

impl ReplayedEntry {
    /// Creates a new instance from raw parts
    pub fn new(id: EntryIdentifier, payload: Vec<u8>) -> Self {
        Self { id, payload }
    }
}

#[async_trait]
impl RawQueueEntry for ReplayedEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn acknowledge(&mut self) -> Result<(), QueueError> {
        Ok(())
    }
}
