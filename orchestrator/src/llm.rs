// OpenAI-compatible chat completions and embeddings behind injectable traits.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::models::{ChatCompletion, ChatMessage, TokenUsage};

/// OpenAI caps the number of inputs per embeddings request.
const EMBEDDING_BATCH_SIZE: usize = 1000;

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], stop: &[&str]) -> Result<ChatCompletion>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AgentError::EmbeddingError("no embedding returned for query".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    temperature: f64,
}

impl OpenAiClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            temperature: config.chat_temperature,
        }
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
        service: &'static str,
    ) -> Result<R> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::UpstreamError {
                service,
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage], stop: &[&str]) -> Result<ChatCompletion> {
        let request = ChatCompletionsRequest {
            model: &self.chat_model,
            messages,
            temperature: self.temperature,
            stop: if stop.is_empty() { None } else { Some(stop) },
        };

        debug!(
            "Requesting chat completion ({} messages, model {})",
            messages.len(),
            self.chat_model
        );

        let parsed: ChatCompletionsResponse = self
            .post("chat/completions", &request, "chat completions")
            .await?;

        let choice = parsed.choices.into_iter().next();
        Ok(ChatCompletion {
            content: choice
                .as_ref()
                .and_then(|c| c.message.content.clone())
                .unwrap_or_default(),
            model: parsed.model,
            finish_reason: choice.and_then(|c| c.finish_reason),
            usage: parsed.usage,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBEDDING_BATCH_SIZE) {
            let request = EmbeddingsRequest {
                model: &self.embedding_model,
                input: batch,
            };

            debug!("Requesting {} embeddings", batch.len());

            let parsed: EmbeddingsResponse =
                self.post("embeddings", &request, "embeddings").await?;

            if parsed.data.len() != batch.len() {
                return Err(AgentError::EmbeddingError(format!(
                    "expected {} embeddings, received {}",
                    batch.len(),
                    parsed.data.len()
                )));
            }

            let mut data = parsed.data;
            data.sort_by_key(|d| d.index);
            vectors.extend(data.into_iter().map(|d| d.embedding));
        }

        Ok(vectors)
    }
}

/// Shared HTTP client with the configured per-request timeout.
pub fn http_client(config: &Config) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .user_agent(concat!("travel-orchestrator/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [&'a str]>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}
