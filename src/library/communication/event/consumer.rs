use super::super::super::EmptyResult;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Entity which may consume and process notifications
///
/// Implementations are expected to be idempotent as the same notification may be
/// delivered more than once and to complete in a bounded amount of time as the cursor
/// of the consumer group is not advanced while they are running.
#[async_trait]
pub trait Consumer {
    /// Notification to consume
    type Notification: DeserializeOwned + Send + Sync;

    /// Processes an event notification and returns whether it succeeded or failed
    async fn consume(&self, notification: Self::Notification) -> EmptyResult;
}

#[async_trait]
impl<C> Consumer for Arc<C>
where
    C: Consumer + Send + Sync,
{
    type Notification = C::Notification;

    async fn consume(&self, notification: Self::Notification) -> EmptyResult {
        self.as_ref().consume(notification).await
    }
}
