use super::{ProducerGateway, PublishError};
use crate::domain::{AirQualityBatch, ReadingBatch, TemperatureBatch};
use crate::library::communication::LogClientFactory;
use crate::module::http::{health, json_reply, Message};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::error;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

const MAX_BODY_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Serialize)]
struct PublishReply {
    accepted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// `POST /temperature`, `POST /airquality`, and `GET /health`
pub fn routes<F>(
    gateway: Arc<ProducerGateway<F>>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone
where
    F: LogClientFactory + 'static,
{
    let with_gateway = warp::any().map(move || gateway.clone());

    let temperature = warp::path("temperature")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::json())
        .and(with_gateway.clone())
        .and_then(|batch: TemperatureBatch, gateway: Arc<ProducerGateway<F>>| {
            submit(gateway, batch.into())
        });

    let air_quality = warp::path("airquality")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::json())
        .and(with_gateway)
        .and_then(|batch: AirQualityBatch, gateway: Arc<ProducerGateway<F>>| {
            submit(gateway, batch.into())
        });

    temperature.or(air_quality).or(health())
}

async fn submit<F: LogClientFactory>(
    gateway: Arc<ProducerGateway<F>>,
    batch: ReadingBatch,
) -> Result<impl Reply, Infallible> {
    let reply = match gateway.publish(&batch).await {
        Ok(accepted) => json_reply(
            &PublishReply {
                accepted,
                message: None,
            },
            StatusCode::CREATED,
        ),
        Err(PublishError::EmptyBatch) => json_reply(
            &Message::new(PublishError::EmptyBatch),
            StatusCode::BAD_REQUEST,
        ),
        Err(error @ PublishError::Unavailable(_)) => {
            json_reply(&Message::new(error), StatusCode::SERVICE_UNAVAILABLE)
        }
        Err(PublishError::Partial {
            accepted,
            total,
            source,
        }) => {
            error!(accepted, total, %source, "Batch has been appended partially");

            json_reply(
                &PublishReply {
                    accepted,
                    message: Some(format!("failed to append reading {}: {}", accepted, source)),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    };

    Ok(reply)
}
