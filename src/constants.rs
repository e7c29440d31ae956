//! Constant values shared by all modules

/// Port on which the receiver accepts reading batches
pub const PORT_RECEIVER: &str = "8080";

/// Port on which the storage module exposes its statistics
pub const PORT_STORAGE: &str = "8090";

/// Port on which the analyzer answers replay queries
pub const PORT_ANALYZER: &str = "8110";

/// Default name of the stream all sensor events are appended to
pub const DEFAULT_TOPIC: &str = "events";

/// Approximate number of entries retained in the event stream
pub const DEFAULT_QUEUE_LIMIT: &str = "100000";

/// Number of most recent readings kept by the storage module
pub const DEFAULT_RETAINED_READINGS: &str = "100000";

/// Consumer group used by the storage module
pub const DEFAULT_CONSUMER_GROUP: &str = "event_group";
