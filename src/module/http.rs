//! Pieces shared by the HTTP surfaces of all modules

use crate::harness::TerminationSignal;
use crate::library::EmptyResult;
use serde::Serialize;
use std::net::SocketAddr;
use tracing::info;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

/// Body of replies which carry no data
#[derive(Debug, Serialize)]
pub(super) struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

/// Serializes the body and attaches a status code
pub(super) fn json_reply<T: Serialize>(body: &T, status: StatusCode) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(body), status)
}

/// `GET /health`, answers as long as the process is able to serve requests
pub(super) fn health() -> impl Filter<Extract = (Json,), Error = Rejection> + Clone {
    warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&Health { status: "healthy" }))
}

/// Serves the routes on all interfaces until termination is requested
pub(super) async fn serve<F>(
    routes: F,
    port: u16,
    name: &'static str,
    termination: TerminationSignal,
) -> EmptyResult
where
    F: Filter<Error = Rejection> + Clone + Send + Sync + 'static,
    F::Extract: Reply,
{
    let source_addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(source_addr, termination.requested())?;

    info!(%addr, "Listening for {} requests", name);
    server.await;

    Ok(())
}
