use super::{QueryError, ReplayQueryEngine};
use crate::domain::event::EventType;
use crate::library::communication::LogClientFactory;
use crate::module::http::{health, json_reply, Message};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

#[derive(Debug, Deserialize)]
struct IndexQuery {
    index: usize,
}

/// `GET /temperature?index=`, `GET /airquality?index=`, `GET /stats`, and `GET /health`
pub fn routes<F>(
    engine: Arc<ReplayQueryEngine<F>>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone
where
    F: LogClientFactory + 'static,
{
    let with_engine = warp::any().map(move || engine.clone());

    let temperature = warp::path("temperature")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<IndexQuery>())
        .and(with_engine.clone())
        .and_then(|query: IndexQuery, engine: Arc<ReplayQueryEngine<F>>| {
            find(engine, EventType::Temperature, query.index)
        });

    let air_quality = warp::path("airquality")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<IndexQuery>())
        .and(with_engine.clone())
        .and_then(|query: IndexQuery, engine: Arc<ReplayQueryEngine<F>>| {
            find(engine, EventType::AirQuality, query.index)
        });

    let stats = warp::path("stats")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_engine)
        .and_then(count::<F>);

    temperature.or(air_quality).or(stats).or(health())
}

async fn find<F: LogClientFactory>(
    engine: Arc<ReplayQueryEngine<F>>,
    event_type: EventType,
    index: usize,
) -> Result<impl Reply, Infallible> {
    Ok(match engine.find_nth(event_type, index).await {
        Ok(payload) => json_reply(&payload, StatusCode::OK),
        Err(error) => error_reply(error),
    })
}

async fn count<F: LogClientFactory>(
    engine: Arc<ReplayQueryEngine<F>>,
) -> Result<impl Reply, Infallible> {
    Ok(match engine.count_all().await {
        Ok(counts) => json_reply(&counts, StatusCode::OK),
        Err(error) => error_reply(error),
    })
}

fn error_reply(error: QueryError) -> warp::reply::WithStatus<warp::reply::Json> {
    let status = match error {
        QueryError::NotFound { .. } => StatusCode::NOT_FOUND,
        QueryError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };

    json_reply(&Message::new(error), status)
}
