mod common;

use common::*;
use fireline::domain::event::{EventPayload, EventType};
use fireline::library::communication::event::RawNotificationPublisher;
use fireline::library::communication::implementation::memory::{MemoryLog, MemoryLogFactory};
use fireline::library::communication::LogClientFactory;
use fireline::module::analyzer::{QueryError, ReplayQueryEngine};
use fireline::module::receiver::ProducerGateway;
use pretty_assertions::assert_eq;
use std::time::Duration;

const IDLE: Duration = Duration::from_millis(100);

fn engine(log: &MemoryLog) -> ReplayQueryEngine<MemoryLogFactory> {
    ReplayQueryEngine::new(MemoryLogFactory::new(log.clone()), queue(), IDLE)
}

fn gateway(log: &MemoryLog) -> ProducerGateway<MemoryLogFactory> {
    ProducerGateway::new(MemoryLogFactory::new(log.clone()), queue())
}

#[tokio::test]
async fn find_second_of_three_temperature_readings() {
    let log = MemoryLog::new();
    gateway(&log)
        .publish(&temperature_batch(&[21.0, 22.0, 23.0]))
        .await
        .unwrap();

    let ids = trace_ids(&log).await;
    assert!(ids[0] < ids[1] && ids[1] < ids[2]);

    let payload = engine(&log)
        .find_nth(EventType::Temperature, 1)
        .await
        .unwrap();
    assert_eq!(payload.trace_id(), ids[1]);

    match payload {
        EventPayload::Temperature(reading) => assert_eq!(reading.temperature_celsius, 22.0),
        other => panic!("unexpected payload {:?}", other),
    }

    assert!(matches!(
        engine(&log).find_nth(EventType::Temperature, 5).await,
        Err(QueryError::NotFound { index: 5, .. })
    ));
}

#[tokio::test]
async fn address_readings_per_type() {
    let log = MemoryLog::new();
    let gateway = gateway(&log);

    gateway
        .publish(&temperature_batch(&[10.0]))
        .await
        .unwrap();
    gateway
        .publish(&air_quality_batch(&[100.0, 200.0]))
        .await
        .unwrap();
    gateway
        .publish(&temperature_batch(&[11.0]))
        .await
        .unwrap();

    let engine = engine(&log);

    for (index, expected) in [10.0, 11.0].iter().enumerate() {
        match engine.find_nth(EventType::Temperature, index).await.unwrap() {
            EventPayload::Temperature(reading) => {
                assert_eq!(reading.temperature_celsius, *expected)
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    match engine.find_nth(EventType::AirQuality, 1).await.unwrap() {
        EventPayload::AirQuality(reading) => assert_eq!(reading.air_quality, 200.0),
        other => panic!("unexpected payload {:?}", other),
    }

    assert!(engine.find_nth(EventType::Temperature, 2).await.is_err());
}

#[tokio::test]
async fn count_envelopes_by_type() {
    let log = MemoryLog::new();
    let gateway = gateway(&log);

    gateway
        .publish(&temperature_batch(&[1.0, 2.0, 3.0]))
        .await
        .unwrap();
    gateway
        .publish(&air_quality_batch(&[4.0, 5.0]))
        .await
        .unwrap();

    let counts = engine(&log).count_all().await.unwrap();

    assert_eq!(
        serde_json::to_value(&counts).unwrap(),
        serde_json::json!({ "temperature_reading": 3, "airquality_reading": 2 })
    );
}

#[tokio::test]
async fn count_empty_log() {
    let log = MemoryLog::new();

    let counts = engine(&log).count_all().await.unwrap();

    assert_eq!(counts.total(), 0);
}

#[tokio::test]
async fn tolerate_undecodable_records() {
    let log = MemoryLog::new();
    let gateway = gateway(&log);
    let client = MemoryLogFactory::new(log.clone()).connect().await.unwrap();

    gateway.publish(&temperature_batch(&[1.0])).await.unwrap();
    client.publish_raw(b"\xff\xfe", &queue()).await.unwrap();
    gateway.publish(&temperature_batch(&[2.0])).await.unwrap();

    let engine = engine(&log);

    assert_eq!(
        engine
            .count_all()
            .await
            .unwrap()
            .get(EventType::Temperature),
        2
    );
    assert!(engine.find_nth(EventType::Temperature, 1).await.is_ok());
}

#[tokio::test]
async fn run_concurrent_queries_independently() {
    let log = MemoryLog::new();
    gateway(&log)
        .publish(&temperature_batch(&[1.0, 2.0, 3.0]))
        .await
        .unwrap();

    let engine = std::sync::Arc::new(engine(&log));
    let queries: Vec<_> = (0..3)
        .map(|index| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.find_nth(EventType::Temperature, index).await })
        })
        .collect();

    let ids = trace_ids(&log).await;
    for (index, query) in queries.into_iter().enumerate() {
        assert_eq!(query.await.unwrap().unwrap().trace_id(), ids[index]);
    }
}

#[tokio::test]
async fn report_unreachable_log() {
    let log = MemoryLog::new();
    log.set_online(false).await;

    assert!(matches!(
        engine(&log).find_nth(EventType::Temperature, 0).await,
        Err(QueryError::Unavailable(_))
    ));
    assert!(matches!(
        engine(&log).count_all().await,
        Err(QueryError::Unavailable(_))
    ));
}

#[tokio::test]
async fn report_outage_during_scan() {
    let log = MemoryLog::new();
    gateway(&log)
        .publish(&temperature_batch(&[1.0]))
        .await
        .unwrap();

    let engine = ReplayQueryEngine::new(
        MemoryLogFactory::new(log.clone()),
        queue(),
        Duration::from_secs(10),
    );

    let outage = {
        let log = log.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            log.set_online(false).await;
        })
    };

    assert!(matches!(
        engine.count_all().await,
        Err(QueryError::Unavailable(_))
    ));
    outage.await.unwrap();
}
