use super::super::super::event::{EntryIdentifier, QueueDescriptor, RawNotificationPublisher};
use super::super::super::QueueError;
use super::RedisLogClient;
use super::{STREAM_ID_NEW, STREAM_PAYLOAD_KEY};
use async_trait::async_trait;
use redis::streams::StreamMaxlen;
use redis::AsyncCommands;

/// [`RawNotificationPublisher`] implementation using [`XADD`](https://redis.io/commands/xadd)
#[async_trait]
impl RawNotificationPublisher for RedisLogClient {
    async fn publish_raw(
        &self,
        data: &[u8],
        descriptor: &QueueDescriptor,
    ) -> Result<EntryIdentifier, QueueError> {
        let limit = StreamMaxlen::Approx(descriptor.limit());
        let mut con = self.shared.clone();

        let id = con
            .xadd_maxlen::<_, _, _, _, String>(
                descriptor.key(),
                limit,
                STREAM_ID_NEW,
                &[(STREAM_PAYLOAD_KEY, data)],
            )
            .await?;

        Ok(id)
    }
}
