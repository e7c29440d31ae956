//! Ingestion of sensor batches into the event log

use async_trait::async_trait;
use std::sync::Arc;
use warp::Filter;

mod gateway;
mod options;
mod routes;

pub use gateway::{ProducerGateway, PublishError};
pub use options::Options;
pub use routes::routes;

use super::http::serve;
use crate::harness::{Heart, JobSet, Module};
use crate::library::BoxedError;

/// Module implementation
pub struct Receiver {
    options: Options,
}

impl Receiver {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Module for Receiver {
    async fn run(&mut self, jobs: &mut JobSet) -> Result<Option<Heart>, BoxedError> {
        let gateway = Arc::new(ProducerGateway::new(
            self.options.log.factory(),
            self.options.log.queue(),
        ));

        let routes = routes(gateway).with(warp::trace::request());
        let port = self.options.port;

        jobs.spawn("receiver_server", move |termination| {
            serve(routes, port, "receiver", termination)
        });

        Ok(Some(Heart::without_heart_stone()))
    }
}
