use super::StatsSink;
use crate::domain::event::EventType;
use crate::module::http::health;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, Rejection, Reply};

#[derive(Debug, Deserialize)]
struct WindowQuery {
    start_timestamp: DateTime<Utc>,
    end_timestamp: DateTime<Utc>,
}

/// `GET /temperature`, `GET /airquality`, `GET /stats`, and `GET /health`
///
/// Reading queries take a `start_timestamp` (inclusive) and an `end_timestamp` (exclusive)
/// which are matched against the time a reading has been recorded by this instance.
pub fn routes(
    sink: Arc<StatsSink>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let with_sink = warp::any().map(move || sink.clone());

    let temperature = warp::path("temperature")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<WindowQuery>())
        .and(with_sink.clone())
        .and_then(|query: WindowQuery, sink: Arc<StatsSink>| {
            readings(sink, EventType::Temperature, query)
        });

    let air_quality = warp::path("airquality")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<WindowQuery>())
        .and(with_sink.clone())
        .and_then(|query: WindowQuery, sink: Arc<StatsSink>| {
            readings(sink, EventType::AirQuality, query)
        });

    let stats = warp::path("stats")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_sink)
        .and_then(|sink: Arc<StatsSink>| async move {
            Ok::<_, Infallible>(warp::reply::json(&sink.stats().await))
        });

    temperature.or(air_quality).or(stats).or(health())
}

async fn readings(
    sink: Arc<StatsSink>,
    event_type: EventType,
    query: WindowQuery,
) -> Result<impl Reply, Infallible> {
    let readings = sink
        .readings(event_type, query.start_timestamp, query.end_timestamp)
        .await;

    Ok(warp::reply::json(&readings))
}
