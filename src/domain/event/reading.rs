use super::{EventType, TraceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Single temperature measurement taken near a fire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    /// Identifier assigned once by the producer
    pub trace_id: TraceId,
    /// Fire the reading relates to
    pub fire_id: String,
    /// Latitude of the reporting sensor
    pub latitude: f64,
    /// Longitude of the reporting sensor
    pub longitude: f64,
    /// Measured temperature
    pub temperature_celsius: f64,
    /// Relative humidity, not every sensor measures it
    #[serde(default)]
    pub humidity_level: Option<f64>,
    /// Time at which the batch containing this reading was reported
    pub batch_timestamp: DateTime<Utc>,
    /// Time at which the reading was taken
    pub reading_timestamp: DateTime<Utc>,
}

/// Single air quality measurement taken at a named location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityReading {
    /// Identifier assigned once by the producer
    pub trace_id: TraceId,
    /// Fire the reading relates to
    pub fire_id: String,
    /// Human readable name of the measuring location
    pub location_name: String,
    /// Particulate matter level reported for the whole batch
    pub particulate_level: f64,
    /// Air quality index
    pub air_quality: f64,
    /// Opacity of the smoke
    pub smoke_opacity: f64,
    /// Time at which the batch containing this reading was reported
    pub batch_timestamp: DateTime<Utc>,
    /// Time at which the reading was taken
    pub reading_timestamp: DateTime<Utc>,
}

/// Type specific content of an [`EventEnvelope`](super::EventEnvelope)
///
/// Serializes to the plain reading, the discriminator lives in the envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    #[allow(missing_docs)]
    Temperature(TemperatureReading),
    #[allow(missing_docs)]
    AirQuality(AirQualityReading),
}

impl EventPayload {
    /// Discriminator matching the variant
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::Temperature(_) => EventType::Temperature,
            EventPayload::AirQuality(_) => EventType::AirQuality,
        }
    }

    /// Identifier assigned when the reading was published
    pub fn trace_id(&self) -> TraceId {
        match self {
            EventPayload::Temperature(reading) => reading.trace_id,
            EventPayload::AirQuality(reading) => reading.trace_id,
        }
    }
}

impl From<TemperatureReading> for EventPayload {
    fn from(reading: TemperatureReading) -> Self {
        EventPayload::Temperature(reading)
    }
}

impl From<AirQualityReading> for EventPayload {
    fn from(reading: AirQualityReading) -> Self {
        EventPayload::AirQuality(reading)
    }
}
