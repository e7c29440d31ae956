//! Wire representation of events
//!
//! Every entry in the log holds exactly one envelope encoded as UTF-8 JSON:
//!
//! ```json
//! {
//!     "type": "temperature_reading",
//!     "occurred_at": "2025-09-01T12:00:00Z",
//!     "payload": { "trace_id": 1, "fire_id": "F-1", ... }
//! }
//! ```
//!
//! Decoding validates the payload against the declared type once, thus consumers never observe
//! partially populated readings.

use super::{AirQualityReading, EventPayload, TemperatureReading};
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const TYPE_TEMPERATURE: &str = "temperature_reading";
const TYPE_AIR_QUALITY: &str = "airquality_reading";

/// Discriminator of an [`EventEnvelope`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Envelope contains a [`TemperatureReading`]
    #[serde(rename = "temperature_reading")]
    Temperature,
    /// Envelope contains an [`AirQualityReading`]
    #[serde(rename = "airquality_reading")]
    AirQuality,
}

impl EventType {
    /// All known types
    pub const ALL: [EventType; 2] = [EventType::Temperature, EventType::AirQuality];

    /// Name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Temperature => TYPE_TEMPERATURE,
            EventType::AirQuality => TYPE_AIR_QUALITY,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`EventType`]
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown event type '{0}'")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            TYPE_TEMPERATURE => Ok(EventType::Temperature),
            TYPE_AIR_QUALITY => Ok(EventType::AirQuality),
            other => Err(UnknownEventType(other.to_owned())),
        }
    }
}

/// Errors raised while encoding or decoding an [`EventEnvelope`]
#[derive(Debug, Error)]
pub enum CodecError {
    /// Envelope is not valid JSON or lacks one of its fields
    #[error("malformed envelope")]
    Syntax(#[source] serde_json::Error),
    /// Envelope declares a type this version does not know
    #[error(transparent)]
    UnknownType(#[from] UnknownEventType),
    /// Payload does not match the declared type
    #[error("payload does not match type {event_type}: {source}")]
    InvalidPayload {
        /// Declared type
        event_type: EventType,
        /// Reason the payload has been rejected
        source: serde_json::Error,
    },
}

/// Typed and timestamped wrapper around one reading, the unit appended to the log
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireEnvelope")]
pub struct EventEnvelope {
    /// Producer local time at which the envelope has been created
    pub occurred_at: DateTime<Utc>,
    /// Reading carried by this envelope
    pub payload: EventPayload,
}

impl EventEnvelope {
    /// Wraps a payload, stamping it with the current time
    pub fn new(payload: EventPayload) -> Self {
        Self {
            occurred_at: Utc::now(),
            payload,
        }
    }

    /// Discriminator of the contained payload
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    /// Encodes the envelope into its wire representation
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(CodecError::Syntax)
    }

    /// Decodes and validates an envelope from its wire representation
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let wire: WireEnvelope = serde_json::from_slice(data).map_err(CodecError::Syntax)?;
        Self::try_from(wire)
    }
}

impl Serialize for EventEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut envelope = serializer.serialize_struct("EventEnvelope", 3)?;
        envelope.serialize_field("type", &self.event_type())?;
        envelope.serialize_field("occurred_at", &self.occurred_at)?;
        envelope.serialize_field("payload", &self.payload)?;
        envelope.end()
    }
}

/// Envelope as it is found on the wire, before the payload has been validated
#[derive(Deserialize)]
struct WireEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    occurred_at: DateTime<Utc>,
    payload: Value,
}

impl TryFrom<WireEnvelope> for EventEnvelope {
    type Error = CodecError;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        let event_type: EventType = wire.event_type.parse()?;
        let invalid = |source| CodecError::InvalidPayload { event_type, source };

        let payload = match event_type {
            EventType::Temperature => {
                serde_json::from_value::<TemperatureReading>(wire.payload).map(EventPayload::from)
            }
            EventType::AirQuality => {
                serde_json::from_value::<AirQualityReading>(wire.payload).map(EventPayload::from)
            }
        }
        .map_err(invalid)?;

        Ok(Self {
            occurred_at: wire.occurred_at,
            payload,
        })
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn temperature_envelope() -> Value {
        json!({
            "type": "temperature_reading",
            "occurred_at": "2025-09-01T12:00:00Z",
            "payload": {
                "trace_id": 42,
                "fire_id": "F-17",
                "latitude": 49.28,
                "longitude": -123.12,
                "temperature_celsius": 61.5,
                "batch_timestamp": "2025-09-01T11:59:00Z",
                "reading_timestamp": "2025-09-01T11:58:30Z"
            }
        })
    }

    #[test]
    fn decode_temperature_envelope() {
        let data = serde_json::to_vec(&temperature_envelope()).unwrap();
        let envelope = EventEnvelope::decode(&data).unwrap();

        assert_eq!(envelope.event_type(), EventType::Temperature);
        assert_eq!(envelope.payload.trace_id(), 42);

        match envelope.payload {
            EventPayload::Temperature(reading) => {
                assert_eq!(reading.fire_id, "F-17");
                assert_eq!(reading.humidity_level, None);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn encode_type_next_to_payload() {
        let data = serde_json::to_vec(&temperature_envelope()).unwrap();
        let envelope = EventEnvelope::decode(&data).unwrap();

        let encoded: Value = serde_json::from_slice(&envelope.encode().unwrap()).unwrap();

        assert_eq!(encoded["type"], "temperature_reading");
        assert_eq!(encoded["payload"]["fire_id"], "F-17");
        assert_eq!(encoded["payload"]["humidity_level"], Value::Null);
    }

    #[test]
    fn reject_unknown_type() {
        let mut raw = temperature_envelope();
        raw["type"] = json!("wind_reading");
        let data = serde_json::to_vec(&raw).unwrap();

        assert!(matches!(
            EventEnvelope::decode(&data),
            Err(CodecError::UnknownType(UnknownEventType(name))) if name == "wind_reading"
        ));
    }

    #[test]
    fn reject_payload_of_other_type() {
        let mut raw = temperature_envelope();
        raw["type"] = json!("airquality_reading");
        let data = serde_json::to_vec(&raw).unwrap();

        assert!(matches!(
            EventEnvelope::decode(&data),
            Err(CodecError::InvalidPayload {
                event_type: EventType::AirQuality,
                ..
            })
        ));
    }

    #[test]
    fn reject_invalid_json() {
        assert!(matches!(
            EventEnvelope::decode(b"{ not json"),
            Err(CodecError::Syntax(_))
        ));
    }

    #[test]
    fn reject_envelope_through_serde() {
        let mut raw = temperature_envelope();
        raw["payload"]["latitude"] = json!("north");

        assert!(serde_json::from_value::<EventEnvelope>(raw).is_err());
    }

    #[test]
    fn parse_event_types() {
        assert_eq!(
            "temperature_reading".parse::<EventType>().unwrap(),
            EventType::Temperature
        );
        assert_eq!(
            "airquality_reading".parse::<EventType>().unwrap(),
            EventType::AirQuality
        );
        assert_eq!(
            "smoke".parse::<EventType>(),
            Err(UnknownEventType("smoke".into()))
        );
    }
}
