use std::sync::Arc;
use warp::{Filter, Rejection, Reply};

use crate::error::handle_rejection;
use crate::metrics;
use crate::pipeline::TravelAgent;

pub mod invoke;

/// Upper bound on invocation payloads. The limit needs `Content-Length`, so
/// chunked uploads are answered with 411.
const MAX_EVENT_BYTES: u64 = 256 * 1024;

pub fn routes(
    agent: Arc<TravelAgent>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let invoke_route = warp::path("invoke")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_EVENT_BYTES))
        .and(warp::body::json())
        .and(with_agent(agent))
        .and_then(invoke::handle_invoke);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({"status": "healthy"})));

    let metrics_route = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handle_metrics);

    health
        .or(metrics_route)
        .or(invoke_route)
        .recover(handle_rejection)
}

async fn handle_metrics() -> Result<impl Reply, Rejection> {
    let (body, content_type) = metrics::render().map_err(warp::reject::custom)?;
    Ok(warp::reply::with_header(body, "Content-Type", content_type))
}

fn with_agent(
    agent: Arc<TravelAgent>,
) -> impl Filter<Extract = (Arc<TravelAgent>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || agent.clone())
}
