//! Various options usable by modules
//!
//! The structs in this module allow other modules to flatten them into
//! their own options struct. This allows for a unified yet non-cluttered
//! option set.

use crate::constants::{DEFAULT_CONSUMER_GROUP, DEFAULT_QUEUE_LIMIT, DEFAULT_TOPIC};
use crate::library::communication::event::{
    ExhaustedAction, JitteredBackoff, QueueDescriptor, RedeliveryPolicy,
};
use crate::library::communication::implementation::redis::RedisLogFactory;
use crate::library::helpers::{parse_millis, parse_seconds};
use std::time::Duration;
use structopt::StructOpt;

/// Options for connecting to the event log
#[derive(Debug, StructOpt)]
pub struct LogOptions {
    /// Redis database server URL
    #[structopt(
        short = "r",
        long = "redis",
        env = "REDIS",
        default_value = "redis://localhost:6379/",
        value_name = "url"
    )]
    pub url: String,

    /// Stream all events are appended to
    #[structopt(long, env, default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// Approximate number of entries retained in the stream
    #[structopt(long, env, default_value = DEFAULT_QUEUE_LIMIT)]
    pub queue_limit: usize,

    /// Seconds to wait for a connection before considering the log unavailable
    #[structopt(long, env, default_value = "4", parse(try_from_str = parse_seconds), value_name = "seconds")]
    pub connect_timeout: Duration,
}

impl LogOptions {
    /// Descriptor of the event stream
    pub fn queue(&self) -> QueueDescriptor {
        QueueDescriptor::new(self.topic.clone(), self.queue_limit)
    }

    /// Factory creating clients of the configured log
    pub fn factory(&self) -> RedisLogFactory {
        RedisLogFactory::new(self.url.clone(), self.connect_timeout)
    }
}

/// Options for members of a consumer group
#[derive(Debug, StructOpt)]
pub struct ConsumerOptions {
    /// Consumer group to join
    #[structopt(long, env, default_value = DEFAULT_CONSUMER_GROUP)]
    pub group: String,

    /// Unique and stable identifier for this instance.
    /// It is used to resume work after a crash
    /// or deliberate restart, thus it may not change across
    /// executions!
    #[structopt(long = "id", env = "CONSUMER_ID", default_value = "storage")]
    pub id: String,

    /// Maximum number of entries fetched at once
    #[structopt(long, env = "CONSUMER_BATCH_SIZE", default_value = "10")]
    pub batch_size: usize,

    /// Lower bound of the delay between reconnection attempts in milliseconds
    #[structopt(long, env, default_value = "500", parse(try_from_str = parse_millis), value_name = "ms")]
    pub backoff_min: Duration,

    /// Upper bound of the delay between reconnection attempts in milliseconds
    #[structopt(long, env, default_value = "1500", parse(try_from_str = parse_millis), value_name = "ms")]
    pub backoff_max: Duration,

    /// Number of times an entry is handed to the sink before giving up
    #[structopt(long, env, default_value = "3")]
    pub handler_attempts: u32,

    /// Delay between two attempts to process an entry in milliseconds
    #[structopt(long, env, default_value = "100", parse(try_from_str = parse_millis), value_name = "ms")]
    pub handler_retry_delay: Duration,

    /// Action once every attempt failed, either `skip` or `reconnect`
    #[structopt(long, env, default_value = "skip")]
    pub on_handler_exhausted: ExhaustedAction,
}

impl ConsumerOptions {
    /// Delay policy between reconnection attempts
    pub fn backoff(&self) -> JitteredBackoff {
        JitteredBackoff::new(self.backoff_min, self.backoff_max)
    }

    /// Policy applied when the sink fails
    pub fn redelivery(&self) -> RedeliveryPolicy {
        RedeliveryPolicy {
            attempts: self.handler_attempts,
            delay: self.handler_retry_delay,
            exhausted: self.on_handler_exhausted,
        }
    }
}

/// Options for replaying the event log
#[derive(Debug, StructOpt)]
pub struct ReplayOptions {
    /// Milliseconds without new entries after which the log is considered exhausted
    #[structopt(long, env, default_value = "1000", parse(try_from_str = parse_millis), value_name = "ms")]
    pub idle_timeout: Duration,

    /// Maximum number of entries fetched at once
    #[structopt(long, env = "REPLAY_BATCH_SIZE", default_value = "100")]
    pub batch_size: usize,
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, StructOpt)]
    struct Combined {
        #[structopt(flatten)]
        log: LogOptions,
        #[structopt(flatten)]
        consumer: ConsumerOptions,
    }

    #[test]
    fn provide_defaults() {
        let options = Combined::from_iter_safe(&["test"]).unwrap();

        assert_eq!(options.log.topic, "events");
        assert_eq!(options.log.queue().limit(), 100_000);
        assert_eq!(options.log.connect_timeout, Duration::from_secs(4));
        assert_eq!(options.consumer.group, "event_group");
        assert_eq!(options.consumer.redelivery(), RedeliveryPolicy::default());
    }

    #[test]
    fn parse_handler_policy() {
        let options = Combined::from_iter_safe(&[
            "test",
            "--handler-attempts",
            "5",
            "--on-handler-exhausted",
            "reconnect",
        ])
        .unwrap();

        let redelivery = options.consumer.redelivery();
        assert_eq!(redelivery.attempts, 5);
        assert_eq!(redelivery.exhausted, ExhaustedAction::Reconnect);
    }
}
