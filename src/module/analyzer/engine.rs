//! Index addressable queries answered by replaying the event log
//!
//! Every query opens its own throwaway replay starting at the earliest retained entry and scans
//! forward in log order. The log counts as exhausted once no entry arrived within the idle timeout,
//! thus a query observes a snapshot and misses entries appended after it stopped waiting.
//! Each query costs a full read of the log.

use crate::domain::event::{EventCounts, EventEnvelope, EventPayload, EventType};
use crate::library::communication::event::{
    QueueDescriptor, QueueEntry, QueueProvider, RawQueueEntry,
};
use crate::library::communication::{LogClientFactory, QueueError};
use futures::StreamExt;
use std::ops::ControlFlow;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

const DEFAULT_BATCH_SIZE: usize = 100;

/// Errors raised while answering a query
#[derive(Debug, Error)]
pub enum QueryError {
    /// Log holds fewer envelopes of the type than requested
    #[error("no {event_type} at index {index}")]
    NotFound {
        /// Requested type
        event_type: EventType,
        /// Requested zero-based position
        index: usize,
    },
    /// Log could not be read
    #[error("event log is unavailable")]
    Unavailable(#[source] QueueError),
}

/// Answers queries by scanning the log from its start
pub struct ReplayQueryEngine<F: LogClientFactory> {
    factory: F,
    queue: QueueDescriptor,
    batch_size: usize,
    idle_timeout: Duration,
}

impl<F: LogClientFactory> ReplayQueryEngine<F> {
    /// Creates a new engine which treats `idle_timeout` without new entries as the end of the log
    pub fn new(factory: F, queue: QueueDescriptor, idle_timeout: Duration) -> Self {
        Self {
            factory,
            queue,
            batch_size: DEFAULT_BATCH_SIZE,
            idle_timeout,
        }
    }

    /// Sets the maximum number of entries fetched from the log at once
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Returns the payload of the `index`-th (zero-based) envelope of the given type in log order
    #[instrument(skip(self), fields(queue = self.queue.key()))]
    pub async fn find_nth(
        &self,
        event_type: EventType,
        index: usize,
    ) -> Result<EventPayload, QueryError> {
        let mut seen = 0;

        let found = self
            .scan(|envelope| {
                if envelope.event_type() != event_type {
                    ControlFlow::Continue(())
                } else if seen == index {
                    ControlFlow::Break(envelope.payload)
                } else {
                    seen += 1;
                    ControlFlow::Continue(())
                }
            })
            .await?;

        match found {
            Some(payload) => {
                info!(trace_id = payload.trace_id(), "Found {}", event_type);
                Ok(payload)
            }
            None => {
                info!(available = seen, "No {} at requested index", event_type);
                Err(QueryError::NotFound { event_type, index })
            }
        }
    }

    /// Counts all envelopes in the log by type
    #[instrument(skip(self), fields(queue = self.queue.key()))]
    pub async fn count_all(&self) -> Result<EventCounts, QueryError> {
        let mut counts = EventCounts::default();

        self.scan(|envelope| {
            counts.record(envelope.event_type());
            ControlFlow::<()>::Continue(())
        })
        .await?;

        info!(total = counts.total(), "Counted envelopes");
        Ok(counts)
    }

    /// Visits every decodable envelope in log order until the visitor breaks or the log is exhausted
    async fn scan<T, V>(&self, mut visit: V) -> Result<Option<T>, QueryError>
    where
        V: FnMut(EventEnvelope) -> ControlFlow<T> + Send,
        T: Send,
    {
        let client = self
            .factory
            .connect()
            .await
            .map_err(QueryError::Unavailable)?;

        let mut entries = client
            .replay(&self.queue, self.batch_size, self.idle_timeout)
            .await
            .map_err(QueryError::Unavailable)?;

        let mut scanned: usize = 0;

        while let Some(entry) = entries.next().await {
            let entry = entry.map_err(QueryError::Unavailable)?;
            scanned += 1;

            match entry.parse_payload::<EventEnvelope>() {
                Ok(envelope) => {
                    if let ControlFlow::Break(value) = visit(envelope) {
                        debug!(scanned, "Stopped replay early");
                        return Ok(Some(value));
                    }
                }
                Err(error) => warn!(id = entry.id(), %error, "Skipping malformed entry"),
            }
        }

        debug!(scanned, "Replay exhausted");
        Ok(None)
    }
}
