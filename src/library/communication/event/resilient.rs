//! Long-lived consumption of a queue which survives outages of the log
//!
//! The [`ResilientConsumer`] drives a small state machine:
//!
//! ```text
//! Disconnected ──connect──▶ ClientReady ──subscribe──▶ Subscribed
//!      ▲                         │                         │
//!      └──────── back off ◀──────┴───────── fault ◀────────┘
//! ```
//!
//! Any transport fault, no matter in which state it occurs, drops both the client and the
//! subscription, waits for a delay chosen by the [`BackoffPolicy`] and starts over. There is no
//! upper bound on the number of attempts.
//!
//! Entries are acknowledged only after the [`Consumer`] returned successfully. If the process dies
//! in between, the log still lists the entry as pending for this consumer and delivers it again
//! once the consumer resubscribes, resulting in at-least-once delivery.

use super::super::{LogClientFactory, QueueError};
use super::{
    BackoffPolicy, Consumer, ConsumerGroupDescriptor, ConsumerIdentifier, EntryIdentifier,
    EntryStream, JitteredBackoff, QueueDescriptor, QueueEntry, QueueProvider, RawQueueEntry,
};
use futures::{Future, StreamExt};
use std::any::type_name;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

const DEFAULT_BATCH_SIZE: usize = 10;

/// Connection state of a [`ResilientConsumer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Neither a client nor a subscription exist
    Disconnected,
    /// A client has been created but the subscription has not been established yet
    ClientReady,
    /// Entries are being received and dispatched
    Subscribed,
}

/// Action taken once the consumer failed to process an entry on every attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustedAction {
    /// Acknowledge the entry anyway and continue with the next one
    Skip,
    /// Leave the entry unacknowledged and resubscribe so that the log delivers it again
    Reconnect,
}

/// Error returned when parsing an unknown [`ExhaustedAction`]
#[derive(Debug, Error)]
#[error("unknown action '{0}', expected 'skip' or 'reconnect'")]
pub struct UnknownExhaustedAction(String);

impl FromStr for ExhaustedAction {
    type Err = UnknownExhaustedAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Self::Skip),
            "reconnect" => Ok(Self::Reconnect),
            other => Err(UnknownExhaustedAction(other.to_owned())),
        }
    }
}

/// Policy applied when the [`Consumer`] fails to process an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeliveryPolicy {
    /// Number of times the consumer is invoked for one entry (at least once)
    pub attempts: u32,
    /// Delay between two attempts
    pub delay: Duration,
    /// What happens after the last failed attempt
    pub exhausted: ExhaustedAction,
}

impl Default for RedeliveryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(100),
            exhausted: ExhaustedAction::Skip,
        }
    }
}

enum Session<C: QueueProvider> {
    Disconnected,
    ClientReady(C),
    Subscribed(C, EntryStream<C::Entry>),
}

#[derive(Debug, Error)]
enum SessionFault {
    #[error("transport failed: {0}")]
    Transport(QueueError),
    #[error("subscription ended")]
    Closed,
    #[error("consumer gave up on entry {0}")]
    HandlerExhausted(EntryIdentifier),
}

enum Outcome {
    Handled,
    Malformed,
    Exhausted,
}

/// Consumer group member which keeps processing a queue for the lifetime of the process
pub struct ResilientConsumer<F: LogClientFactory, C> {
    factory: F,
    consumer: C,
    queue: QueueDescriptor,
    group: ConsumerGroupDescriptor,
    identifier: ConsumerIdentifier,
    batch_size: usize,
    backoff: Box<dyn BackoffPolicy>,
    redelivery: RedeliveryPolicy,
    state: watch::Sender<ConnectionState>,
}

impl<F, C> ResilientConsumer<F, C>
where
    F: LogClientFactory,
    C: Consumer + Send + Sync,
{
    /// Creates a new instance using a [`JitteredBackoff`] and the default [`RedeliveryPolicy`]
    pub fn new(
        factory: F,
        consumer: C,
        queue: QueueDescriptor,
        group: ConsumerGroupDescriptor,
        identifier: ConsumerIdentifier,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            factory,
            consumer,
            queue,
            group,
            identifier,
            batch_size: DEFAULT_BATCH_SIZE,
            backoff: Box::new(JitteredBackoff::default()),
            redelivery: RedeliveryPolicy::default(),
            state,
        }
    }

    /// Replaces the delay policy used between reconnection attempts
    pub fn with_backoff<B: BackoffPolicy + 'static>(mut self, backoff: B) -> Self {
        self.backoff = Box::new(backoff);
        self
    }

    /// Replaces the policy applied when the consumer fails
    pub fn with_redelivery(mut self, redelivery: RedeliveryPolicy) -> Self {
        self.redelivery = redelivery;
        self
    }

    /// Sets the maximum number of entries fetched from the log at once
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Watches the connection state
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Consumes the queue forever
    ///
    /// This future never resolves, the only way to stop it is dropping it. Doing so while an
    /// entry is being processed leaves that entry unacknowledged.
    #[instrument(skip(self), fields(queue = self.queue.key(), group = self.group.identifier(), consumer = %self.identifier))]
    pub async fn run(&self) {
        let mut session = Session::Disconnected;

        loop {
            session = self.advance(session).await;
        }
    }

    /// Consumes the queue until the `shutdown` future resolves
    pub async fn run_until<S>(&self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::select! {
            _ = self.run() => {},
            _ = shutdown => info!("Shutting down consumer of {}", type_name::<C::Notification>()),
        }

        self.transition(ConnectionState::Disconnected);
    }

    async fn advance(&self, session: Session<F::Client>) -> Session<F::Client> {
        match session {
            Session::Disconnected => match self.factory.connect().await {
                Ok(client) => {
                    info!("Log client created");
                    self.transition(ConnectionState::ClientReady);
                    Session::ClientReady(client)
                }
                Err(error) => {
                    warn!(%error, "Failed to create log client");
                    self.back_off().await;
                    Session::Disconnected
                }
            },
            Session::ClientReady(client) => {
                let subscription = client
                    .consume(
                        &self.queue,
                        &self.group,
                        &self.identifier,
                        self.batch_size,
                        None,
                    )
                    .await;

                match subscription {
                    Ok(stream) => {
                        info!("Subscribed to queue");
                        self.transition(ConnectionState::Subscribed);
                        Session::Subscribed(client, stream)
                    }
                    Err(error) => {
                        warn!(%error, "Failed to subscribe to queue");
                        drop(client);
                        self.transition(ConnectionState::Disconnected);
                        self.back_off().await;
                        Session::Disconnected
                    }
                }
            }
            Session::Subscribed(client, mut stream) => {
                let fault = self.dispatch(&mut stream).await;
                warn!(%fault, "Subscription faulted, reconnecting");

                drop(stream);
                drop(client);
                self.transition(ConnectionState::Disconnected);
                self.back_off().await;
                Session::Disconnected
            }
        }
    }

    async fn dispatch(
        &self,
        stream: &mut EntryStream<<F::Client as QueueProvider>::Entry>,
    ) -> SessionFault {
        while let Some(item) = stream.next().await {
            let mut entry = match item {
                Ok(entry) => entry,
                Err(error) => return SessionFault::Transport(error),
            };

            match self.process(&entry).await {
                Outcome::Handled => debug!(id = entry.id(), "Processed entry"),
                Outcome::Malformed => {}
                Outcome::Exhausted => match self.redelivery.exhausted {
                    ExhaustedAction::Skip => error!(
                        id = entry.id(),
                        attempts = self.redelivery.attempts,
                        "Skipping entry which could not be processed"
                    ),
                    ExhaustedAction::Reconnect => {
                        return SessionFault::HandlerExhausted(entry.id().to_owned())
                    }
                },
            }

            if let Err(error) = entry.acknowledge().await {
                return SessionFault::Transport(error);
            }
        }

        SessionFault::Closed
    }

    async fn process<E>(&self, entry: &E) -> Outcome
    where
        E: QueueEntry + Sync,
    {
        let attempts = self.redelivery.attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            // Parsing again on every attempt as the consumer takes ownership of the notification
            let notification = match entry.parse_payload::<C::Notification>() {
                Ok(notification) => notification,
                Err(error) => {
                    error!(id = entry.id(), %error, "Dropping malformed entry");
                    return Outcome::Malformed;
                }
            };

            match self.consumer.consume(notification).await {
                Ok(()) => return Outcome::Handled,
                Err(error) => {
                    warn!(
                        id = entry.id(),
                        attempt,
                        %error,
                        "Failed to consume {}",
                        type_name::<C::Notification>()
                    );

                    if attempt >= attempts {
                        return Outcome::Exhausted;
                    }

                    sleep(self.redelivery.delay).await;
                }
            }
        }
    }

    async fn back_off(&self) {
        let delay = self.backoff.next_delay();
        debug!(?delay, "Backing off before reconnecting");
        sleep(delay).await;
    }

    fn transition(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}

#[cfg(test)]
mod does {
    use super::*;

    #[test]
    fn parse_exhausted_actions() {
        assert_eq!(
            "skip".parse::<ExhaustedAction>().unwrap(),
            ExhaustedAction::Skip
        );
        assert_eq!(
            "reconnect".parse::<ExhaustedAction>().unwrap(),
            ExhaustedAction::Reconnect
        );
        assert!("retry".parse::<ExhaustedAction>().is_err());
    }

    #[test]
    fn name_abandoned_entry_in_fault() {
        let fault = SessionFault::HandlerExhausted("5-0".into());
        assert_eq!(fault.to_string(), "consumer gave up on entry 5-0");

        let fault = SessionFault::Transport(QueueError::Closed);
        assert_eq!(fault.to_string(), "transport failed: subscription has been closed");
    }
}
