//! Events appended to the log and their wire representation

mod counts;
mod envelope;
mod reading;
mod trace;

pub use counts::EventCounts;
pub use envelope::{CodecError, EventEnvelope, EventType, UnknownEventType};
pub use reading::{AirQualityReading, EventPayload, TemperatureReading};
pub use trace::{TraceId, TraceIdGenerator};
