use crate::domain::event::{EventEnvelope, EventPayload, EventType, TraceId};
use crate::library::communication::event::Consumer;
use crate::library::EmptyResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{debug, trace};

const DEFAULT_CAPACITY: usize = 100_000;

/// Statistics aggregated over all readings seen so far
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReadingStats {
    /// Distinct temperature readings
    pub num_temperature_readings: usize,
    /// Highest temperature seen
    pub max_temperature_celsius: Option<f64>,
    /// Distinct air quality readings
    pub num_airquality_readings: usize,
    /// Highest air quality index seen
    pub max_air_quality: Option<f64>,
    /// Time at which the last distinct reading has been recorded
    pub last_updated: Option<DateTime<Utc>>,
}

struct StoredReading {
    recorded_at: DateTime<Utc>,
    payload: EventPayload,
}

struct SinkState {
    readings: BTreeMap<TraceId, StoredReading>,
    stats: ReadingStats,
}

/// Aggregation sink attached to the resilient consumer
///
/// Readings are keyed by their trace id, delivering the same envelope again leaves the
/// statistics untouched. Only the most recent `capacity` readings (by trace id) are retained
/// and deduplicated. Once a reading has been evicted, a redelivery of it counts as new.
pub struct StatsSink {
    capacity: usize,
    state: Mutex<SinkState>,
}

impl Default for StatsSink {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl StatsSink {
    /// Creates an empty sink retaining the default number of readings
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty sink retaining at most `capacity` readings
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(SinkState {
                readings: BTreeMap::new(),
                stats: ReadingStats::default(),
            }),
        }
    }

    /// Snapshot of the current statistics
    pub async fn stats(&self) -> ReadingStats {
        self.state.lock().await.stats.clone()
    }

    /// Retained readings of one type recorded within `[start, end)`, oldest first
    pub async fn readings(
        &self,
        event_type: EventType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<EventPayload> {
        let state = self.state.lock().await;

        let mut matching: Vec<&StoredReading> = state
            .readings
            .values()
            .filter(|stored| stored.payload.event_type() == event_type)
            .filter(|stored| stored.recorded_at >= start && stored.recorded_at < end)
            .collect();
        matching.sort_by_key(|stored| stored.recorded_at);

        debug!(
            %event_type,
            %start,
            %end,
            results = matching.len(),
            "Queried stored readings"
        );

        matching
            .into_iter()
            .map(|stored| stored.payload.clone())
            .collect()
    }

    async fn record(&self, envelope: EventEnvelope, recorded_at: DateTime<Utc>) {
        let trace_id = envelope.payload.trace_id();
        let mut state = self.state.lock().await;

        if state.readings.contains_key(&trace_id) {
            debug!(trace_id, "Ignoring duplicate {}", envelope.event_type());
            return;
        }

        let stats = &mut state.stats;

        match &envelope.payload {
            EventPayload::Temperature(reading) => {
                stats.num_temperature_readings += 1;
                stats.max_temperature_celsius =
                    Some(max(stats.max_temperature_celsius, reading.temperature_celsius));
            }
            EventPayload::AirQuality(reading) => {
                stats.num_airquality_readings += 1;
                stats.max_air_quality = Some(max(stats.max_air_quality, reading.air_quality));
            }
        }

        stats.last_updated = Some(recorded_at);
        trace!(trace_id, "Stored {}", envelope.event_type());

        state.readings.insert(
            trace_id,
            StoredReading {
                recorded_at,
                payload: envelope.payload,
            },
        );

        while state.readings.len() > self.capacity {
            if let Some(&oldest) = state.readings.keys().next() {
                state.readings.remove(&oldest);
            }
        }
    }
}

#[async_trait]
impl Consumer for StatsSink {
    type Notification = EventEnvelope;

    async fn consume(&self, envelope: EventEnvelope) -> EmptyResult {
        self.record(envelope, Utc::now()).await;
        Ok(())
    }
}

fn max(current: Option<f64>, value: f64) -> f64 {
    current.map_or(value, |current| current.max(value))
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::domain::event::{AirQualityReading, TemperatureReading};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn temperature(trace_id: TraceId, celsius: f64) -> EventEnvelope {
        EventEnvelope::new(
            TemperatureReading {
                trace_id,
                fire_id: "F-1".into(),
                latitude: 0.0,
                longitude: 0.0,
                temperature_celsius: celsius,
                humidity_level: None,
                batch_timestamp: Utc::now(),
                reading_timestamp: Utc::now(),
            }
            .into(),
        )
    }

    fn air_quality(trace_id: TraceId, index: f64) -> EventEnvelope {
        EventEnvelope::new(
            AirQualityReading {
                trace_id,
                fire_id: "F-1".into(),
                location_name: "Camp".into(),
                particulate_level: 10.0,
                air_quality: index,
                smoke_opacity: 0.1,
                batch_timestamp: Utc::now(),
                reading_timestamp: Utc::now(),
            }
            .into(),
        )
    }

    #[tokio::test]
    async fn aggregate_readings() {
        let sink = StatsSink::new();

        sink.consume(temperature(1, 30.0)).await.unwrap();
        sink.consume(temperature(2, 45.5)).await.unwrap();
        sink.consume(air_quality(3, 120.0)).await.unwrap();

        let stats = sink.stats().await;
        assert_eq!(stats.num_temperature_readings, 2);
        assert_eq!(stats.max_temperature_celsius, Some(45.5));
        assert_eq!(stats.num_airquality_readings, 1);
        assert_eq!(stats.max_air_quality, Some(120.0));
        assert!(stats.last_updated.is_some());
    }

    #[tokio::test]
    async fn ignore_redelivered_readings() {
        let sink = StatsSink::new();

        sink.consume(temperature(1, 30.0)).await.unwrap();
        let once = sink.stats().await;

        sink.consume(temperature(1, 30.0)).await.unwrap();
        assert_eq!(sink.stats().await, once);
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 12, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn select_readings_recorded_within_window() {
        let sink = StatsSink::new();

        sink.record(temperature(1, 30.0), at(0)).await;
        sink.record(air_quality(2, 80.0), at(5)).await;
        sink.record(temperature(3, 31.0), at(5)).await;
        sink.record(temperature(4, 32.0), at(10)).await;

        let readings = sink.readings(EventType::Temperature, at(0), at(10)).await;
        let ids: Vec<TraceId> = readings.iter().map(EventPayload::trace_id).collect();

        // Start is inclusive while the end is exclusive
        assert_eq!(ids, vec![1, 3]);
        assert!(sink
            .readings(EventType::AirQuality, at(6), at(10))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn evict_oldest_readings_beyond_capacity() {
        let sink = StatsSink::with_capacity(2);

        for trace_id in 1..=3 {
            sink.record(temperature(trace_id, 20.0), at(1)).await;
        }

        let retained = sink.readings(EventType::Temperature, at(0), at(2)).await;
        let ids: Vec<TraceId> = retained.iter().map(EventPayload::trace_id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(sink.stats().await.num_temperature_readings, 3);

        // Still within the retained window, thus recognized as duplicate
        sink.record(temperature(3, 20.0), at(1)).await;
        assert_eq!(sink.stats().await.num_temperature_readings, 3);
    }
}
