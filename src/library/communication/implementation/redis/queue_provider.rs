use super::super::super::event::{
    ConsumerGroupDescriptor, EntryStream, QueueDescriptor, QueueLocation, QueueProvider,
    ReplayedEntry,
};
use super::super::super::QueueError;
use super::{
    RedisLogClient, RedisQueueEntry, STREAM_ID_ADDITIONS, STREAM_ID_HEAD, STREAM_ID_TAIL,
    STREAM_PAYLOAD_KEY,
};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use redis::aio::ConnectionLike;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::convert::TryInto;
use std::time::Duration;
use tracing::{debug, warn};

/// Queue provider implementation using [Redis Streams](https://redis.io/topics/streams-intro)
#[async_trait]
impl QueueProvider for RedisLogClient {
    type Entry = RedisQueueEntry;
    type Replayed = ReplayedEntry;

    /// Consumes a redis stream data structure using the following steps:
    ///
    /// 1. Create the stream and/or consumer group if it does not exist
    /// 2. Start streaming entries from the PEL until the queue head is reached
    /// 3. Wait for and stream new entries in a blocking manner
    /// 4. Bail if no messages has been received within `idle_timeout` or block indefinitely
    async fn consume(
        &self,
        queue: &QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        consumer: &str, // &ConsumerIdentifier
        batch_size: usize,
        idle_timeout: Option<Duration>,
    ) -> Result<EntryStream<Self::Entry>, QueueError> {
        let key = queue.key().to_owned();

        // Create a redis connection for the blocking XREADGROUP command
        let mut con = self.owned_connection().await?;

        // Create the group if it does not exist
        create_consumer_group(&mut con, &key, group).await;

        let request = ReadRequest {
            key: key.clone(),
            member: Some((group.identifier().to_owned(), consumer.to_owned())),
            count: batch_size,
            block: block_duration(idle_timeout),
        };

        let shared = self.shared.clone();
        let group = group.identifier().to_owned();

        let stream = xread_stream(con, request, ReadCursor::Pending(STREAM_ID_HEAD.into()))
            .map(move |result| {
                result.map(|entry| {
                    RedisQueueEntry::new(shared.clone(), entry, key.clone(), group.clone())
                })
            })
            .boxed();

        Ok(stream)
    }

    async fn replay(
        &self,
        queue: &QueueDescriptor,
        batch_size: usize,
        idle_timeout: Duration,
    ) -> Result<EntryStream<Self::Replayed>, QueueError> {
        let con = self.owned_connection().await?;

        let request = ReadRequest {
            key: queue.key().to_owned(),
            member: None,
            count: batch_size,
            block: block_duration(Some(idle_timeout)),
        };

        let stream = xread_stream(con, request, ReadCursor::After(STREAM_ID_HEAD.into()))
            .map(|result| {
                result.map(|entry| {
                    let payload = entry.get(STREAM_PAYLOAD_KEY).unwrap_or_default();
                    ReplayedEntry::new(entry.id, payload)
                })
            })
            .boxed();

        Ok(stream)
    }
}

/// Position from which the next read continues
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReadCursor {
    /// Group member reading its pending entries after the given id
    Pending(String),
    /// Group member reading entries never delivered to anyone
    Additions,
    /// Reader without group continuing after the given id
    After(String),
}

impl ReadCursor {
    fn id(&self) -> &str {
        match self {
            ReadCursor::Pending(id) | ReadCursor::After(id) => id,
            ReadCursor::Additions => STREAM_ID_ADDITIONS,
        }
    }

    /// Where to continue after a read which returned entries up to `last_id`,
    /// `None` once the stream is exhausted
    fn advance(self, last_id: Option<&str>) -> Option<ReadCursor> {
        match (self, last_id) {
            // Still working through entries received but never acknowledged before a crash
            (ReadCursor::Pending(_), Some(id)) => Some(ReadCursor::Pending(id.to_owned())),
            // Pending entries are done, move on to "latest"
            (ReadCursor::Pending(_), None) => Some(ReadCursor::Additions),
            (ReadCursor::Additions, Some(_)) => Some(ReadCursor::Additions),
            (ReadCursor::After(_), Some(id)) => Some(ReadCursor::After(id.to_owned())),
            // Nothing arrived within the idle timeout
            (ReadCursor::Additions, None) | (ReadCursor::After(_), None) => None,
        }
    }
}

/// Parameters of the XREAD/XREADGROUP command issued on every iteration
///
/// [`StreamReadOptions`] is consumed by each read, thus it is rebuilt from these values.
struct ReadRequest {
    key: String,
    member: Option<(String, String)>,
    count: usize,
    block: usize,
}

impl ReadRequest {
    fn options(&self) -> StreamReadOptions {
        let options = StreamReadOptions::default()
            .count(self.count)
            .block(self.block);

        match &self.member {
            Some((group, consumer)) => options.group(group, consumer),
            None => options,
        }
    }
}

fn block_duration(idle_timeout: Option<Duration>) -> usize {
    // A value of zero blocks forever, thus any timeout is rounded up to at least one millisecond
    idle_timeout
        .map(|d| d.as_millis().try_into().unwrap_or(usize::MAX).max(1))
        .unwrap_or_default()
}

async fn create_consumer_group<C: ConnectionLike + Send>(
    con: &mut C,
    key: &str,
    group: &ConsumerGroupDescriptor,
) {
    let start_id = match group.start() {
        QueueLocation::Head => STREAM_ID_HEAD,
        QueueLocation::Tail => STREAM_ID_TAIL,
    };

    // Fails with BUSYGROUP if the group exists which is fine. Any other failure
    // will surface again on the first read.
    if let Err(error) = con
        .xgroup_create_mkstream::<_, _, _, ()>(key, group.identifier(), start_id)
        .await
    {
        debug!(%error, "Consumer group has not been created");
    }
}

fn xread_stream<C: ConnectionLike + Send + 'static>(
    con: C,
    request: ReadRequest,
    cursor: ReadCursor,
) -> EntryStream<StreamId> {
    let stream = stream::unfold(
        (con, request, Some(cursor)),
        |(mut con, request, cursor)| async move {
            let cursor = cursor?;

            let result = con
                .xread_options::<_, _, Option<StreamReadReply>>(
                    &[&request.key],
                    &[cursor.id()],
                    request.options(),
                )
                .await;

            match result {
                Ok(reply) => {
                    let ids = reply
                        .and_then(|mut reply| reply.keys.pop())
                        .map(|stream| stream.ids)
                        .unwrap_or_default();

                    let last_id = ids.last().map(|entry| entry.id.as_str());
                    let next = cursor.advance(last_id);

                    Some((Ok(ids), (con, request, next)))
                }
                Err(error) => {
                    warn!(%error, "Encountered error reading from redis stream");
                    Some((Err(error.into()), (con, request, None)))
                }
            }
        },
    );

    // It is possible to stream in batches (receiving multiple entries from redis)
    // by setting the options.count value >1. The resulting stream will still yield
    // one at a time to make it easier to use.
    stream
        .flat_map(|result| match result {
            Ok(batch) => stream::iter(batch).map(Ok).boxed(),
            Err(e) => stream::once(async { Err(e) }).boxed(),
        })
        .boxed()
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn walk_pending_entries_before_additions() {
        let cursor = ReadCursor::Pending(STREAM_ID_HEAD.into());

        let cursor = cursor.advance(Some("1-0")).unwrap();
        assert_eq!(cursor, ReadCursor::Pending("1-0".into()));
        assert_eq!(cursor.id(), "1-0");

        let cursor = cursor.advance(None).unwrap();
        assert_eq!(cursor, ReadCursor::Additions);
        assert_eq!(cursor.id(), ">");
    }

    #[test]
    fn keep_reading_additions_until_idle() {
        let cursor = ReadCursor::Additions;

        assert_eq!(
            cursor.clone().advance(Some("7-0")),
            Some(ReadCursor::Additions)
        );
        assert_eq!(cursor.advance(None), None);
    }

    #[test]
    fn end_replay_once_idle() {
        let cursor = ReadCursor::After(STREAM_ID_HEAD.into());
        assert_eq!(cursor.id(), "0");

        let cursor = cursor.advance(Some("3-1")).unwrap();
        assert_eq!(cursor, ReadCursor::After("3-1".into()));
        assert_eq!(cursor.advance(None), None);
    }

    #[test]
    fn block_at_least_one_millisecond() {
        assert_eq!(block_duration(None), 0);
        assert_eq!(block_duration(Some(Duration::from_micros(10))), 1);
        assert_eq!(block_duration(Some(Duration::from_millis(1000))), 1000);
    }
}
