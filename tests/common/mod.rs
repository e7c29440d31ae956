#![allow(dead_code)]

use chrono::Utc;
use fireline::domain::event::{EventEnvelope, TraceId};
use fireline::domain::{
    AirQualityBatch, AirQualitySample, ReadingBatch, TemperatureBatch, TemperatureSample,
};
use fireline::library::communication::event::{
    ConnectionState, ConsumerGroupDescriptor, QueueDescriptor, QueueLocation,
};
use fireline::library::communication::implementation::memory::MemoryLog;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, timeout, Instant};

pub const TOPIC: &str = "events";
pub const GROUP: &str = "event_group";
pub const PATIENCE: Duration = Duration::from_secs(5);

pub fn queue() -> QueueDescriptor {
    QueueDescriptor::new(TOPIC.into(), 1_000)
}

pub fn group() -> ConsumerGroupDescriptor {
    ConsumerGroupDescriptor::new(GROUP.into(), QueueLocation::Tail)
}

pub fn temperature_batch(celsius: &[f64]) -> ReadingBatch {
    TemperatureBatch {
        fire_id: "F-42".into(),
        latitude: 49.25,
        longitude: -123.1,
        reporting_timestamp: Utc::now(),
        readings: celsius
            .iter()
            .map(|c| TemperatureSample {
                temperature_celsius: *c,
                humidity_level: Some(20.0),
                recorded_timestamp: Utc::now(),
            })
            .collect(),
    }
    .into()
}

pub fn air_quality_batch(indices: &[f64]) -> ReadingBatch {
    AirQualityBatch {
        fire_id: "F-42".into(),
        location_name: "North Ridge".into(),
        particulate_level: 55.0,
        reporting_timestamp: Utc::now(),
        readings: indices
            .iter()
            .map(|i| AirQualitySample {
                air_quality: *i,
                smoke_opacity: 0.4,
                recorded_timestamp: Utc::now(),
            })
            .collect(),
    }
    .into()
}

/// Decodes every entry currently in the log
pub async fn envelopes(log: &MemoryLog) -> Vec<EventEnvelope> {
    log.payloads(TOPIC)
        .await
        .iter()
        .map(|data| EventEnvelope::decode(data).unwrap())
        .collect()
}

pub async fn trace_ids(log: &MemoryLog) -> Vec<TraceId> {
    envelopes(log)
        .await
        .iter()
        .map(|envelope| envelope.payload.trace_id())
        .collect()
}

/// Polls the condition until it holds, panics once the patience ran out
pub async fn eventually<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + PATIENCE;

    while !condition().await {
        if Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }

        sleep(Duration::from_millis(10)).await;
    }
}

/// Waits for the consumer to reach the state and returns how long it took
pub async fn reach(
    states: &mut watch::Receiver<ConnectionState>,
    expected: ConnectionState,
) -> Duration {
    let start = Instant::now();

    timeout(PATIENCE, async {
        while *states.borrow() != expected {
            states.changed().await.unwrap();
        }
    })
    .await
    .unwrap_or_else(|_| panic!("consumer never reached {:?}", expected));

    start.elapsed()
}
