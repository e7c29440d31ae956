//! Batches of readings as reported by field sensors

use super::event::{AirQualityReading, EventPayload, EventType, TemperatureReading, TraceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Temperature sample contained in a [`TemperatureBatch`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSample {
    /// Measured temperature
    pub temperature_celsius: f64,
    /// Relative humidity if measured
    #[serde(default)]
    pub humidity_level: Option<f64>,
    /// Time at which the sample was taken
    pub recorded_timestamp: DateTime<Utc>,
}

/// Temperature samples reported by one sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureBatch {
    /// Fire the samples relate to
    pub fire_id: String,
    /// Latitude of the sensor
    pub latitude: f64,
    /// Longitude of the sensor
    pub longitude: f64,
    /// Time at which the batch was reported
    pub reporting_timestamp: DateTime<Utc>,
    /// Samples in the order they were taken
    pub readings: Vec<TemperatureSample>,
}

/// Air quality sample contained in an [`AirQualityBatch`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualitySample {
    /// Air quality index
    pub air_quality: f64,
    /// Opacity of the smoke
    pub smoke_opacity: f64,
    /// Time at which the sample was taken
    pub recorded_timestamp: DateTime<Utc>,
}

/// Air quality samples reported for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityBatch {
    /// Fire the samples relate to
    pub fire_id: String,
    /// Name of the location
    pub location_name: String,
    /// Particulate matter level at the time of reporting
    pub particulate_level: f64,
    /// Time at which the batch was reported
    pub reporting_timestamp: DateTime<Utc>,
    /// Samples in the order they were taken
    pub readings: Vec<AirQualitySample>,
}

/// Batch of either kind, the input of the producer gateway
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingBatch {
    #[allow(missing_docs)]
    Temperature(TemperatureBatch),
    #[allow(missing_docs)]
    AirQuality(AirQualityBatch),
}

impl ReadingBatch {
    /// Number of readings in the batch
    pub fn len(&self) -> usize {
        match self {
            ReadingBatch::Temperature(batch) => batch.readings.len(),
            ReadingBatch::AirQuality(batch) => batch.readings.len(),
        }
    }

    /// Whether the batch contains no readings
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type of the events created from this batch
    pub fn event_type(&self) -> EventType {
        match self {
            ReadingBatch::Temperature(_) => EventType::Temperature,
            ReadingBatch::AirQuality(_) => EventType::AirQuality,
        }
    }

    /// Combines the batch context with the reading at `index`
    pub fn reading(&self, index: usize, trace_id: TraceId) -> Option<EventPayload> {
        match self {
            ReadingBatch::Temperature(batch) => batch.readings.get(index).map(|sample| {
                TemperatureReading {
                    trace_id,
                    fire_id: batch.fire_id.clone(),
                    latitude: batch.latitude,
                    longitude: batch.longitude,
                    temperature_celsius: sample.temperature_celsius,
                    humidity_level: sample.humidity_level,
                    batch_timestamp: batch.reporting_timestamp,
                    reading_timestamp: sample.recorded_timestamp,
                }
                .into()
            }),
            ReadingBatch::AirQuality(batch) => batch.readings.get(index).map(|sample| {
                AirQualityReading {
                    trace_id,
                    fire_id: batch.fire_id.clone(),
                    location_name: batch.location_name.clone(),
                    particulate_level: batch.particulate_level,
                    air_quality: sample.air_quality,
                    smoke_opacity: sample.smoke_opacity,
                    batch_timestamp: batch.reporting_timestamp,
                    reading_timestamp: sample.recorded_timestamp,
                }
                .into()
            }),
        }
    }
}

impl From<TemperatureBatch> for ReadingBatch {
    fn from(batch: TemperatureBatch) -> Self {
        ReadingBatch::Temperature(batch)
    }
}

impl From<AirQualityBatch> for ReadingBatch {
    fn from(batch: AirQualityBatch) -> Self {
        ReadingBatch::AirQuality(batch)
    }
}
