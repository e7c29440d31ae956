mod common;

use common::*;
use fireline::domain::event::{EventPayload, EventType};
use fireline::library::communication::implementation::memory::{MemoryLog, MemoryLogFactory};
use fireline::module::receiver::{ProducerGateway, PublishError};
use pretty_assertions::assert_eq;
use std::collections::HashSet;

fn gateway(log: &MemoryLog) -> ProducerGateway<MemoryLogFactory> {
    ProducerGateway::new(MemoryLogFactory::new(log.clone()), queue())
}

#[tokio::test]
async fn publish_one_envelope_per_reading_in_order() {
    let log = MemoryLog::new();

    let accepted = gateway(&log)
        .publish(&temperature_batch(&[31.0, 32.0, 33.0, 34.0]))
        .await
        .unwrap();
    assert_eq!(accepted, 4);

    let temperatures: Vec<f64> = envelopes(&log)
        .await
        .into_iter()
        .map(|envelope| match envelope.payload {
            EventPayload::Temperature(reading) => reading.temperature_celsius,
            other => panic!("unexpected payload {:?}", other),
        })
        .collect();

    assert_eq!(temperatures, vec![31.0, 32.0, 33.0, 34.0]);
}

#[tokio::test]
async fn assign_unique_trace_ids() {
    let log = MemoryLog::new();
    let gateway = gateway(&log);

    gateway
        .publish(&temperature_batch(&[1.0, 2.0, 3.0]))
        .await
        .unwrap();
    gateway
        .publish(&air_quality_batch(&[10.0, 20.0]))
        .await
        .unwrap();

    let ids = trace_ids(&log).await;
    let distinct: HashSet<_> = ids.iter().collect();

    assert_eq!(ids.len(), 5);
    assert_eq!(distinct.len(), 5);
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn stamp_envelopes_with_type() {
    let log = MemoryLog::new();

    gateway(&log)
        .publish(&air_quality_batch(&[10.0]))
        .await
        .unwrap();

    let envelope = &envelopes(&log).await[0];
    assert_eq!(envelope.event_type(), EventType::AirQuality);
}

#[tokio::test]
async fn reject_whole_batch_while_log_is_unreachable() {
    let log = MemoryLog::new();
    log.set_online(false).await;

    let result = gateway(&log).publish(&temperature_batch(&[1.0, 2.0])).await;

    assert!(matches!(result, Err(PublishError::Unavailable(_))));
    assert!(log.is_empty(TOPIC).await);
}

#[tokio::test]
async fn report_partially_appended_batches() {
    let log = MemoryLog::new();
    log.limit_appends(Some(2)).await;

    let result = gateway(&log)
        .publish(&temperature_batch(&[1.0, 2.0, 3.0, 4.0]))
        .await;

    match result {
        Err(PublishError::Partial {
            accepted, total, ..
        }) => {
            assert_eq!(accepted, 2);
            assert_eq!(total, 4);
        }
        other => panic!("unexpected result {:?}", other),
    }

    // Appended readings are not rolled back
    assert_eq!(log.len(TOPIC).await, 2);
}

#[tokio::test]
async fn reject_empty_batches() {
    let log = MemoryLog::new();

    let result = gateway(&log).publish(&temperature_batch(&[])).await;

    assert!(matches!(result, Err(PublishError::EmptyBatch)));
    assert!(log.is_empty(TOPIC).await);
}

#[tokio::test]
async fn accept_concurrent_batches() {
    let log = MemoryLog::new();
    let gateway = std::sync::Arc::new(gateway(&log));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                gateway
                    .publish(&temperature_batch(&[i as f64, i as f64 + 0.5]))
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 2);
    }

    let ids: HashSet<_> = trace_ids(&log).await.into_iter().collect();
    assert_eq!(ids.len(), 16);
}
