use super::super::QueueError;
use super::{ConsumerGroupDescriptor, QueueDescriptor, QueueEntry};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;

/// Stream of entries read from a queue
///
/// A transport failure is reported as a final `Err` item after which the stream ends.
pub type EntryStream<E> = BoxStream<'static, Result<E, QueueError>>;

/// Allows consumption of notification queues
#[async_trait]
pub trait QueueProvider {
    /// Type of [`QueueEntry`] returned when consuming as part of a group
    type Entry: QueueEntry + Send + Sync;
    /// Type of [`QueueEntry`] returned when replaying
    type Replayed: QueueEntry + Send + Sync;

    /// Subscribes to new notifications on a given queue joining the specified [`ConsumerGroup`](ConsumerGroupDescriptor)
    /// with the given [`ConsumerIdentifier`](super::ConsumerIdentifier) or creates it if it does not exist.
    ///
    /// Entries previously delivered to the same consumer but never acknowledged are yielded first.
    /// The stream ends if no entry arrived within `idle_timeout` or blocks indefinitely when it is `None`.
    async fn consume(
        &self,
        queue: &QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        consumer: &str, // &ConsumerIdentifier
        batch_size: usize,
        idle_timeout: Option<Duration>,
    ) -> Result<EntryStream<Self::Entry>, QueueError>;

    /// Reads the queue from its earliest retained entry without joining any group
    ///
    /// The stream ends once no new entry arrived within `idle_timeout`.
    async fn replay(
        &self,
        queue: &QueueDescriptor,
        batch_size: usize,
        idle_timeout: Duration,
    ) -> Result<EntryStream<Self::Replayed>, QueueError>;
}
