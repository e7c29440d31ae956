use crate::domain::event::{EventEnvelope, TraceIdGenerator};
use crate::domain::ReadingBatch;
use crate::library::communication::event::{NotificationPublisher, QueueDescriptor};
use crate::library::communication::{LogClientFactory, QueueError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Errors raised while publishing a [`ReadingBatch`]
#[derive(Debug, Error)]
pub enum PublishError {
    /// Batch did not contain a single reading
    #[error("batch contains no readings")]
    EmptyBatch,
    /// Log could not be reached, nothing has been appended
    #[error("event log is unavailable")]
    Unavailable(#[source] QueueError),
    /// Appending failed part way through the batch, earlier readings remain in the log
    #[error("only {accepted} of {total} readings have been appended")]
    Partial {
        /// Readings appended before the failure
        accepted: usize,
        /// Readings in the batch
        total: usize,
        /// Cause of the failed append
        source: QueueError,
    },
}

/// Converts batches of readings into appends to the event log
///
/// The log client is created on first use and shared by all concurrent callers. Whenever an append
/// fails due to a transport fault the client is discarded and recreated on the next call.
pub struct ProducerGateway<F: LogClientFactory> {
    factory: F,
    queue: QueueDescriptor,
    client: RwLock<Option<Arc<F::Client>>>,
    trace_ids: TraceIdGenerator,
}

impl<F: LogClientFactory> ProducerGateway<F> {
    /// Creates a new gateway appending to the given queue, no connection is made yet
    pub fn new(factory: F, queue: QueueDescriptor) -> Self {
        Self {
            factory,
            queue,
            client: RwLock::new(None),
            trace_ids: TraceIdGenerator::new(),
        }
    }

    /// Appends one envelope per reading in batch order and returns the number of appended readings
    ///
    /// Every append is acknowledged by the log before the next one is attempted. If the log can not be
    /// reached before the first append, the whole batch is rejected and nothing is appended.
    #[instrument(skip(self, batch), fields(event_type = %batch.event_type(), readings = batch.len()))]
    pub async fn publish(&self, batch: &ReadingBatch) -> Result<usize, PublishError> {
        if batch.is_empty() {
            return Err(PublishError::EmptyBatch);
        }

        let client = self.client().await.map_err(PublishError::Unavailable)?;
        let total = batch.len();
        let payloads = (0..total).filter_map(|index| batch.reading(index, self.trace_ids.next_id()));

        for (accepted, payload) in payloads.enumerate() {
            let trace_id = payload.trace_id();
            let envelope = EventEnvelope::new(payload);

            match client.publish(&envelope, &self.queue).await {
                Ok(id) => debug!(trace_id, %id, "Appended {}", envelope.event_type()),
                Err(error) => {
                    warn!(trace_id, accepted, %error, "Failed to append reading");

                    if error.is_transport_fault() {
                        self.discard_client().await;
                    }

                    return Err(if accepted == 0 && error.is_transport_fault() {
                        PublishError::Unavailable(error)
                    } else {
                        PublishError::Partial {
                            accepted,
                            total,
                            source: error,
                        }
                    });
                }
            }
        }

        info!("Published batch");
        Ok(total)
    }

    async fn client(&self) -> Result<Arc<F::Client>, QueueError> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.client.write().await;

        // Another caller might have connected while we were waiting for the lock
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = Arc::new(self.factory.connect().await?);
        info!("Connected to event log");
        *slot = Some(client.clone());

        Ok(client)
    }

    async fn discard_client(&self) {
        self.client.write().await.take();
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::domain::event::EventPayload;
    use crate::domain::{AirQualityBatch, AirQualitySample};
    use crate::library::communication::implementation::memory::{MemoryLog, MemoryLogFactory};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn batch(readings: usize) -> ReadingBatch {
        AirQualityBatch {
            fire_id: "F-9".into(),
            location_name: "Ridge".into(),
            particulate_level: 80.0,
            reporting_timestamp: Utc::now(),
            readings: (0..readings)
                .map(|i| AirQualitySample {
                    air_quality: i as f64,
                    smoke_opacity: 0.5,
                    recorded_timestamp: Utc::now(),
                })
                .collect(),
        }
        .into()
    }

    fn gateway(log: &MemoryLog) -> ProducerGateway<MemoryLogFactory> {
        ProducerGateway::new(
            MemoryLogFactory::new(log.clone()),
            QueueDescriptor::new("events".into(), 100),
        )
    }

    #[tokio::test]
    async fn append_readings_in_order() {
        let log = MemoryLog::new();

        assert_eq!(gateway(&log).publish(&batch(3)).await.unwrap(), 3);

        let qualities: Vec<f64> = log
            .payloads("events")
            .await
            .iter()
            .map(|data| match EventEnvelope::decode(data).unwrap().payload {
                EventPayload::AirQuality(reading) => reading.air_quality,
                other => panic!("unexpected payload {:?}", other),
            })
            .collect();

        assert_eq!(qualities, vec![0.0, 1.0, 2.0]);
    }

    #[tokio::test]
    async fn reject_empty_batches() {
        let log = MemoryLog::new();

        assert!(matches!(
            gateway(&log).publish(&batch(0)).await,
            Err(PublishError::EmptyBatch)
        ));
    }

    #[tokio::test]
    async fn reconnect_after_outage() {
        let log = MemoryLog::new();
        let gateway = gateway(&log);

        gateway.publish(&batch(1)).await.unwrap();

        log.set_online(false).await;
        assert!(matches!(
            gateway.publish(&batch(1)).await,
            Err(PublishError::Unavailable(_))
        ));

        log.set_online(true).await;
        assert_eq!(gateway.publish(&batch(2)).await.unwrap(), 2);
        assert_eq!(log.len("events").await, 3);
    }
}
