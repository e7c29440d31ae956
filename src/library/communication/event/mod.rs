//! Structures to realise an event-driven service architecture on top of a durable log
//!
//! Whenever a producer learns about something noteworthy, it publishes a notification by
//! appending it to a [`Queue`](QueueDescriptor). The log keeps entries in the order they were
//! appended and does not forget them when they are read, so every interested party can process
//! the same stream of notifications independently.
//!
//! Notifications are consumed in a reliable and resilient way using a concept called
//! [`ConsumerGroups`](ConsumerGroupDescriptor). When reading as part of a group, consumers define a
//! [`QueueLocation`] from which the group begins processing. All entries have to be acknowledged once
//! processing concludes. Upon crashing, the [`Consumer`](ConsumerIdentifier) resumes from the entries
//! it received but never acknowledged. This ensures that no [`QueueEntries`](QueueEntry) are left
//! unprocessed, at the price of occasionally seeing one twice.
//!
//! Readers which do not care about persisted progress may instead [replay](QueueProvider::replay) the
//! queue from its head. Such a replay holds no cursor and ends once the log has been idle for a while.

mod backoff;
mod consumer;
mod consumer_group;
mod publisher;
mod queue;
mod queue_provider;
mod resilient;

pub use backoff::*;
pub use consumer::*;
pub use consumer_group::*;
pub use publisher::*;
pub use queue::*;
pub use queue_provider::*;
pub use resilient::*;
