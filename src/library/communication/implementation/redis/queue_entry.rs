use super::super::super::event::RawQueueEntry;
use super::super::super::QueueError;
use super::super::json::JsonQueueEntry;
use super::STREAM_PAYLOAD_KEY;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::StreamId;
use redis::AsyncCommands;
use tracing::warn;

/// Redis based implementation of the [`QueueEntry`](crate::library::communication::event::QueueEntry) trait
pub struct RedisQueueEntry {
    con: MultiplexedConnection,
    id: String,
    key: String,
    group: String,
    payload: Vec<u8>,
}

impl RedisQueueEntry {
    pub(super) fn new(
        con: MultiplexedConnection,
        entry: StreamId,
        key: String,
        group: String,
    ) -> Self {
        // An entry without payload still has to flow through so that it can be acknowledged,
        // the empty payload will fail to parse and the entry is dropped by the consumer.
        let payload = entry.get(STREAM_PAYLOAD_KEY).unwrap_or_else(|| {
            warn!(id = %entry.id, "Payload field missing from queue entry");
            Vec::new()
        });

        Self {
            con,
            id: entry.id,
            key,
            group,
            payload,
        }
    }
}

#[async_trait]
impl RawQueueEntry for RedisQueueEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn acknowledge(&mut self) -> Result<(), QueueError> {
        self.con
            .xack::<_, _, _, ()>(&self.key, &self.group, &[&self.id])
            .await?;

        Ok(())
    }
}

impl JsonQueueEntry for RedisQueueEntry {}
