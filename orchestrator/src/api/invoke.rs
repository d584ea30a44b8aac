use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;
use warp::{Rejection, Reply};

use crate::error::{AgentError, Result};
use crate::metrics::INVOCATIONS;
use crate::models::{
    EventBody, InvocationEvent, InvocationResponse, QuestionBody, ResponseBody,
    PLACEHOLDER_QUESTION, SUCCESS_MESSAGE,
};
use crate::pipeline::TravelAgent;

pub async fn handle_invoke(
    event: InvocationEvent,
    agent: Arc<TravelAgent>,
) -> std::result::Result<impl Reply, Rejection> {
    match handle_event(event, &agent).await {
        Ok(response) => {
            INVOCATIONS.with_label_values(&["success"]).inc();
            Ok(warp::reply::json(&response))
        }
        Err(e) => {
            INVOCATIONS.with_label_values(&["error"]).inc();
            Err(warp::reject::custom(e))
        }
    }
}

/// Parses the event, runs the pipeline and wraps the itinerary in the
/// success envelope. Failures propagate unchanged.
pub async fn handle_event(event: InvocationEvent, agent: &TravelAgent) -> Result<InvocationResponse> {
    let request_id = Uuid::new_v4();
    let query = extract_question(&event)?;

    async move {
        info!("Processing question: {}", query);
        let completion = agent.get_response(&query).await?;
        info!("Itinerary ready ({} chars)", completion.content.len());
        success_response(completion.content)
    }
    .instrument(info_span!("invocation", %request_id))
    .await
}

/// The `question` field of the event body, or the placeholder when the body
/// or the field is missing.
pub fn extract_question(event: &InvocationEvent) -> Result<String> {
    let value = match &event.body {
        None => return Ok(PLACEHOLDER_QUESTION.to_string()),
        Some(EventBody::Encoded(raw)) => serde_json::from_str(raw)?,
        Some(EventBody::Decoded(value)) => value.clone(),
    };

    // Same rule for both encodings: only an object can carry `question`.
    let body: QuestionBody = match value {
        value @ serde_json::Value::Object(_) => serde_json::from_value(value)?,
        other => {
            return Err(AgentError::BadEvent(format!(
                "body must be a JSON object, got {other}"
            )))
        }
    };

    Ok(body
        .question
        .unwrap_or_else(|| PLACEHOLDER_QUESTION.to_string()))
}

pub fn success_response(details: String) -> Result<InvocationResponse> {
    let body = serde_json::to_string(&ResponseBody {
        message: SUCCESS_MESSAGE.to_string(),
        details,
    })?;

    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());

    Ok(InvocationResponse {
        status_code: 200,
        headers,
        body,
    })
}
