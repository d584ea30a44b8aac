use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query used when the request body carries no `question`.
pub const PLACEHOLDER_QUESTION: &str = "Parametro question não fornecido";

/// Fixed success message placed in every response body.
pub const SUCCESS_MESSAGE: &str = "Tarefa concluída com sucesso";

// Function invocation envelope

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationEvent {
    #[serde(default)]
    pub body: Option<EventBody>,
}

/// Hosts deliver the body either JSON-encoded as a string or already decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventBody {
    Encoded(String),
    Decoded(serde_json::Value),
}

#[derive(Debug, Default, Deserialize)]
pub struct QuestionBody {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseBody {
    pub message: String,
    pub details: String,
}

// Retrieval models

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub page_content: String,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(page_content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            page_content: page_content.into(),
            metadata,
        }
    }
}

/// Top-k chunks, best match first.
pub type RetrievedDocuments = Vec<DocumentChunk>;

// LLM models

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// One completion returned by the chat model; `content` is forwarded verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletion {
    pub content: String,
    pub model: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}
