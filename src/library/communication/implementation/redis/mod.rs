//! Trait implementations using [`redis`](::redis) streams as the event log
//!
//! | Log operation        | Redis command                                 |
//! |----------------------|-----------------------------------------------|
//! | append               | [`XADD`](https://redis.io/commands/xadd)      |
//! | join a group         | [`XGROUP CREATE`](https://redis.io/commands/xgroup-create) |
//! | subscribe            | [`XREADGROUP`](https://redis.io/commands/xreadgroup) |
//! | commit               | [`XACK`](https://redis.io/commands/xack)      |
//! | replay               | [`XREAD`](https://redis.io/commands/xread)    |

const STREAM_PAYLOAD_KEY: &str = "payload";
const STREAM_ID_NEW: &str = "*";
const STREAM_ID_HEAD: &str = "0";
const STREAM_ID_TAIL: &str = "$";
const STREAM_ID_ADDITIONS: &str = ">";

use super::super::QueueError;
use ::redis::RedisError;

mod factory;
mod publisher;
mod queue_entry;
mod queue_provider;

pub use factory::*;
pub use queue_entry::*;

impl From<RedisError> for QueueError {
    fn from(error: RedisError) -> Self {
        QueueError::Unavailable(error.to_string())
    }
}
