//! In-process event log mirroring the semantics of the redis implementation
//!
//! The log keeps every appended entry, supports consumer groups with pending entry lists,
//! and replays. It can be taken offline to simulate an outage of the broker: while offline,
//! connecting, appending, acknowledging, and reading fail with [`QueueError::Unavailable`].
//! Readers blocked on the log are woken up when it goes offline and report the fault.

use super::super::event::{
    ConsumerGroupDescriptor, EntryIdentifier, EntryStream, QueueDescriptor, QueueLocation,
    QueueProvider, RawNotificationPublisher, RawQueueEntry, ReplayedEntry,
};
use super::super::{LogClientFactory, QueueError};
use super::json::{JsonNotificationPublisher, JsonQueueEntry};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{futures::Notified, Mutex, Notify};
use tokio::time::timeout;

const OFFLINE_MESSAGE: &str = "in-memory log is offline";

type Sequence = u64;

#[derive(Default)]
struct MemoryGroup {
    last_delivered: Sequence,
    pending: HashMap<String, BTreeSet<Sequence>>,
}

#[derive(Default)]
struct MemoryStream {
    entries: Vec<Vec<u8>>,
    groups: HashMap<String, MemoryGroup>,
}

struct LogState {
    online: bool,
    append_budget: Option<usize>,
    streams: HashMap<String, MemoryStream>,
}

impl LogState {
    fn ensure_online(&self) -> Result<(), QueueError> {
        if self.online {
            Ok(())
        } else {
            Err(QueueError::Unavailable(OFFLINE_MESSAGE.into()))
        }
    }
}

struct Shared {
    state: Mutex<LogState>,
    changed: Notify,
}

/// Handle to an in-process event log, cloning it yields another handle to the same log
#[derive(Clone)]
pub struct MemoryLog {
    shared: Arc<Shared>,
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLog {
    /// Creates a new, empty, and online log
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(LogState {
                    online: true,
                    append_budget: None,
                    streams: HashMap::new(),
                }),
                changed: Notify::new(),
            }),
        }
    }

    /// Simulates the broker becoming reachable or unreachable
    pub async fn set_online(&self, online: bool) {
        self.shared.state.lock().await.online = online;
        self.shared.changed.notify_waiters();
    }

    /// Permits only `budget` more appends to succeed, all following ones fail as if the log was unreachable.
    /// Passing `None` lifts the restriction.
    pub async fn limit_appends(&self, budget: Option<usize>) {
        self.shared.state.lock().await.append_budget = budget;
    }

    /// Number of entries in a queue
    pub async fn len(&self, key: &str) -> usize {
        let state = self.shared.state.lock().await;
        state.streams.get(key).map(|s| s.entries.len()).unwrap_or(0)
    }

    /// Whether a queue holds no entries
    pub async fn is_empty(&self, key: &str) -> bool {
        self.len(key).await == 0
    }

    /// Raw payloads of all entries of a queue in log order
    pub async fn payloads(&self, key: &str) -> Vec<Vec<u8>> {
        let state = self.shared.state.lock().await;
        state
            .streams
            .get(key)
            .map(|s| s.entries.clone())
            .unwrap_or_default()
    }

    /// Number of entries delivered to members of a group but not yet acknowledged
    pub async fn pending(&self, key: &str, group: &str) -> usize {
        let state = self.shared.state.lock().await;
        state
            .streams
            .get(key)
            .and_then(|s| s.groups.get(group))
            .map(|g| g.pending.values().map(BTreeSet::len).sum())
            .unwrap_or(0)
    }

    async fn append(&self, key: &str, data: &[u8]) -> Result<EntryIdentifier, QueueError> {
        let mut state = self.shared.state.lock().await;
        state.ensure_online()?;

        if let Some(budget) = state.append_budget.as_mut() {
            if *budget == 0 {
                return Err(QueueError::Unavailable("append budget exhausted".into()));
            }
            *budget -= 1;
        }

        let stream = state.streams.entry(key.to_owned()).or_default();
        stream.entries.push(data.to_vec());
        let sequence = stream.entries.len() as Sequence;

        drop(state);
        self.shared.changed.notify_waiters();

        Ok(entry_id(sequence))
    }

    async fn join(&self, key: &str, group: &ConsumerGroupDescriptor) -> Result<(), QueueError> {
        let mut state = self.shared.state.lock().await;
        state.ensure_online()?;

        let stream = state.streams.entry(key.to_owned()).or_default();
        let tail = stream.entries.len() as Sequence;

        stream
            .groups
            .entry(group.identifier().to_owned())
            .or_insert_with(|| MemoryGroup {
                last_delivered: match group.start() {
                    QueueLocation::Head => 0,
                    QueueLocation::Tail => tail,
                },
                pending: HashMap::new(),
            });

        Ok(())
    }

    async fn acknowledge(
        &self,
        key: &str,
        group: &str,
        consumer: &str,
        sequence: Sequence,
    ) -> Result<(), QueueError> {
        let mut state = self.shared.state.lock().await;
        state.ensure_online()?;

        if let Some(pending) = state
            .streams
            .get_mut(key)
            .and_then(|s| s.groups.get_mut(group))
            .and_then(|g| g.pending.get_mut(consumer))
        {
            pending.remove(&sequence);
        }

        Ok(())
    }

    /// Returns the next entry for a group member, `None` means it has to wait for new entries
    async fn next_for_member(
        &self,
        key: &str,
        group: &str,
        consumer: &str,
        cursor: &mut MemberCursor,
    ) -> Result<Option<(Sequence, Vec<u8>)>, QueueError> {
        let mut state = self.shared.state.lock().await;
        state.ensure_online()?;

        let MemoryStream { entries, groups } = state.streams.entry(key.to_owned()).or_default();
        let group = groups
            .get_mut(group)
            .ok_or_else(|| QueueError::Unavailable(format!("no such consumer group '{}'", group)))?;
        let pending = group.pending.entry(consumer.to_owned()).or_default();

        if let MemberCursor::Pending(after) = *cursor {
            match pending.range(after + 1..).next().copied() {
                Some(sequence) => {
                    *cursor = MemberCursor::Pending(sequence);
                    return Ok(payload_of(entries, sequence).map(|p| (sequence, p)));
                }
                None => *cursor = MemberCursor::Additions,
            }
        }

        match entries.get(group.last_delivered as usize) {
            Some(payload) => {
                group.last_delivered += 1;
                pending.insert(group.last_delivered);
                Ok(Some((group.last_delivered, payload.clone())))
            }
            None => Ok(None),
        }
    }

    async fn next_after(
        &self,
        key: &str,
        after: Sequence,
    ) -> Result<Option<(Sequence, Vec<u8>)>, QueueError> {
        let state = self.shared.state.lock().await;
        state.ensure_online()?;

        let entries = state.streams.get(key).map(|s| s.entries.as_slice());
        Ok(entries
            .and_then(|entries| payload_of(entries, after + 1))
            .map(|payload| (after + 1, payload)))
    }
}

/// Waits for the next change of the log, returns false if nothing changed within the timeout
async fn changed_within(changed: Notified<'_>, idle_timeout: Option<Duration>) -> bool {
    match idle_timeout {
        Some(duration) => timeout(duration, changed).await.is_ok(),
        None => {
            changed.await;
            true
        }
    }
}

fn entry_id(sequence: Sequence) -> EntryIdentifier {
    format!("{}-0", sequence)
}

fn payload_of(entries: &[Vec<u8>], sequence: Sequence) -> Option<Vec<u8>> {
    sequence
        .checked_sub(1)
        .and_then(|index| entries.get(index as usize))
        .cloned()
}

#[derive(Debug, Clone, Copy)]
enum MemberCursor {
    Pending(Sequence),
    Additions,
}

/// [`LogClientFactory`] handing out clients of a [`MemoryLog`]
#[derive(Clone, Default)]
pub struct MemoryLogFactory {
    log: MemoryLog,
}

impl MemoryLogFactory {
    /// Creates a new factory connecting to the given log
    pub fn new(log: MemoryLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl LogClientFactory for MemoryLogFactory {
    type Client = MemoryLogClient;

    async fn connect(&self) -> Result<Self::Client, QueueError> {
        self.log.shared.state.lock().await.ensure_online()?;

        Ok(MemoryLogClient {
            log: self.log.clone(),
        })
    }
}

/// Connected client of a [`MemoryLog`]
pub struct MemoryLogClient {
    log: MemoryLog,
}

impl JsonNotificationPublisher for MemoryLogClient {}

#[async_trait]
impl RawNotificationPublisher for MemoryLogClient {
    async fn publish_raw(
        &self,
        data: &[u8],
        descriptor: &QueueDescriptor,
    ) -> Result<EntryIdentifier, QueueError> {
        self.log.append(descriptor.key(), data).await
    }
}

/// Entry delivered to a member of a consumer group of a [`MemoryLog`]
pub struct MemoryQueueEntry {
    log: MemoryLog,
    key: String,
    group: String,
    consumer: String,
    sequence: Sequence,
    id: EntryIdentifier,
    payload: Vec<u8>,
}

#[async_trait]
impl RawQueueEntry for MemoryQueueEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn acknowledge(&mut self) -> Result<(), QueueError> {
        self.log
            .acknowledge(&self.key, &self.group, &self.consumer, self.sequence)
            .await
    }
}

impl JsonQueueEntry for MemoryQueueEntry {}

#[async_trait]
impl QueueProvider for MemoryLogClient {
    type Entry = MemoryQueueEntry;
    type Replayed = ReplayedEntry;

    /// Entries are handed out one by one, thus the batch size is ignored
    async fn consume(
        &self,
        queue: &QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        consumer: &str, // &ConsumerIdentifier
        _batch_size: usize,
        idle_timeout: Option<Duration>,
    ) -> Result<EntryStream<Self::Entry>, QueueError> {
        self.log.join(queue.key(), group).await?;

        let member = Member {
            log: self.log.clone(),
            key: queue.key().to_owned(),
            group: group.identifier().to_owned(),
            consumer: consumer.to_owned(),
        };

        let stream = stream::unfold(
            Some((member, MemberCursor::Pending(0))),
            move |state| async move {
                let (member, mut cursor) = state?;

                match member.next(&mut cursor, idle_timeout).await {
                    Ok(Some((sequence, payload))) => {
                        let entry = member.entry(sequence, payload);
                        Some((Ok(entry), Some((member, cursor))))
                    }
                    Ok(None) => None,
                    Err(error) => Some((Err(error), None)),
                }
            },
        )
        .boxed();

        Ok(stream)
    }

    async fn replay(
        &self,
        queue: &QueueDescriptor,
        _batch_size: usize,
        idle_timeout: Duration,
    ) -> Result<EntryStream<Self::Replayed>, QueueError> {
        self.log.shared.state.lock().await.ensure_online()?;

        let log = self.log.clone();
        let key = queue.key().to_owned();

        let stream = stream::unfold(Some((log, key, 0)), move |state| async move {
            let (log, key, after) = state?;

            let next = loop {
                // Registering before reading so that no append is missed in between
                let changed = log.shared.changed.notified();

                match log.next_after(&key, after).await {
                    Ok(None) => {}
                    other => break other,
                }

                if !changed_within(changed, Some(idle_timeout)).await {
                    break Ok(None);
                }
            };

            match next {
                Ok(Some((sequence, payload))) => {
                    let entry = ReplayedEntry::new(entry_id(sequence), payload);
                    Some((Ok(entry), Some((log, key, sequence))))
                }
                Ok(None) => None,
                Err(error) => Some((Err(error), None)),
            }
        })
        .boxed();

        Ok(stream)
    }
}

struct Member {
    log: MemoryLog,
    key: String,
    group: String,
    consumer: String,
}

impl Member {
    async fn next(
        &self,
        cursor: &mut MemberCursor,
        idle_timeout: Option<Duration>,
    ) -> Result<Option<(Sequence, Vec<u8>)>, QueueError> {
        loop {
            let changed = self.log.shared.changed.notified();

            if let Some(next) = self
                .log
                .next_for_member(&self.key, &self.group, &self.consumer, cursor)
                .await?
            {
                return Ok(Some(next));
            }

            if !changed_within(changed, idle_timeout).await {
                return Ok(None);
            }
        }
    }

    fn entry(&self, sequence: Sequence, payload: Vec<u8>) -> MemoryQueueEntry {
        MemoryQueueEntry {
            log: self.log.clone(),
            key: self.key.clone(),
            group: self.group.clone(),
            consumer: self.consumer.clone(),
            sequence,
            id: entry_id(sequence),
            payload,
        }
    }
}
