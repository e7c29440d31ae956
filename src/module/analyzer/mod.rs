//! Replay based queries over the event log

use async_trait::async_trait;
use std::sync::Arc;
use warp::Filter;

mod engine;
mod options;
mod routes;

pub use engine::{QueryError, ReplayQueryEngine};
pub use options::Options;
pub use routes::routes;

use super::http::serve;
use crate::harness::{Heart, JobSet, Module};
use crate::library::BoxedError;

/// Module implementation
pub struct Analyzer {
    options: Options,
}

impl Analyzer {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Module for Analyzer {
    async fn run(&mut self, jobs: &mut JobSet) -> Result<Option<Heart>, BoxedError> {
        let engine = ReplayQueryEngine::new(
            self.options.log.factory(),
            self.options.log.queue(),
            self.options.replay.idle_timeout,
        )
        .with_batch_size(self.options.replay.batch_size);

        let routes = routes(Arc::new(engine)).with(warp::trace::request());
        let port = self.options.port;

        jobs.spawn("analyzer_server", move |termination| {
            serve(routes, port, "analyzer", termination)
        });

        Ok(Some(Heart::without_heart_stone()))
    }
}
