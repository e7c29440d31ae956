//! Structures to communicate through a durable, append-only event log
//!
//! Producers append serialized notifications to a queue (in the log sense: an ordered,
//! append-only sequence of entries). Consumers read from it in one of two ways:
//!
//! 1. As a member of a [consumer group](event::ConsumerGroupDescriptor) whose position is
//!    persisted by the log and only advanced when an entry is acknowledged. This is how
//!    long-running processors like the [`ResilientConsumer`](event::ResilientConsumer) operate.
//! 2. As a throwaway reader that replays the queue from its earliest retained entry and
//!    holds no cursor at all. This is used for on-demand queries.
//!
//! All access to the log goes through a client obtained from a [`LogClientFactory`].
//! Clients are cheap to drop and rebuild which is what makes reconnecting after a broker
//! outage a matter of simply asking the factory for a new one.

mod communication_factory;
mod error;

pub mod event;
pub mod implementation;

pub use communication_factory::LogClientFactory;
pub use error::QueueError;
