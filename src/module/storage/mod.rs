//! Aggregation of the event log through a long-lived consumer group member

use async_trait::async_trait;
use std::sync::Arc;
use warp::Filter;

mod options;
mod routes;
mod sink;

pub use options::Options;
pub use routes::routes;
pub use sink::{ReadingStats, StatsSink};

use super::http::serve;
use crate::harness::{Heart, JobSet, Module};
use crate::library::communication::event::{
    ConsumerGroupDescriptor, QueueLocation, ResilientConsumer,
};
use crate::library::BoxedError;

/// Module implementation
pub struct Storage {
    options: Options,
}

impl Storage {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Module for Storage {
    async fn run(&mut self, jobs: &mut JobSet) -> Result<Option<Heart>, BoxedError> {
        let sink = Arc::new(StatsSink::with_capacity(self.options.retain));
        let options = &self.options.consumer;

        let consumer = ResilientConsumer::new(
            self.options.log.factory(),
            sink.clone(),
            self.options.log.queue(),
            ConsumerGroupDescriptor::new(options.group.clone(), QueueLocation::Tail),
            options.id.clone(),
        )
        .with_backoff(options.backoff())
        .with_redelivery(options.redelivery())
        .with_batch_size(options.batch_size);

        jobs.spawn("storage_consumer", move |termination| async move {
            consumer.run_until(termination.requested()).await;
            Ok(())
        });

        let routes = routes(sink).with(warp::trace::request());
        let port = self.options.port;

        jobs.spawn("storage_server", move |termination| {
            serve(routes, port, "storage", termination)
        });

        Ok(Some(Heart::without_heart_stone()))
    }
}
