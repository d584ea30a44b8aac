use thiserror::Error;
use warp::{reject::Reject, Rejection, Reply};

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{service} returned HTTP {status}: {body}")]
    UpstreamError {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Could not parse LLM output: `{0}`")]
    OutputParseError(String),

    #[error("Agent stopped after {0} iterations without a final answer")]
    IterationLimit(usize),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Bad event: {0}")]
    BadEvent(String),

    #[error("Metrics error: {0}")]
    MetricsError(#[from] prometheus::Error),
}

impl AgentError {
    /// Short type name reported in invocation error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::HttpError(_) => "HttpError",
            AgentError::SerializationError(_) => "SerializationError",
            AgentError::ConfigError(_) => "ConfigError",
            AgentError::UpstreamError { .. } => "UpstreamError",
            AgentError::OutputParseError(_) => "OutputParseError",
            AgentError::IterationLimit(_) => "IterationLimit",
            AgentError::EmbeddingError(_) => "EmbeddingError",
            AgentError::BadEvent(_) => "BadEvent",
            AgentError::MetricsError(_) => "MetricsError",
        }
    }
}

impl Reject for AgentError {}

/// Turns a failed invocation into the payload a function host reports for an
/// unhandled error. There is no success-shaped error envelope.
pub async fn handle_rejection(err: Rejection) -> std::result::Result<impl Reply, Rejection> {
    if let Some(agent_err) = err.find::<AgentError>() {
        let json = warp::reply::json(&serde_json::json!({
            "errorMessage": agent_err.to_string(),
            "errorType": agent_err.kind(),
        }));

        Ok(warp::reply::with_status(
            json,
            warp::http::StatusCode::INTERNAL_SERVER_ERROR,
        ))
    } else {
        Err(err)
    }
}
