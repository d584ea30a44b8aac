use serde::Deserialize;

use crate::error::{AgentError, Result};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_CHAT_TEMPERATURE: f64 = 0.7;
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_DUCKDUCKGO_URL: &str = "https://html.duckduckgo.com/html/";
const DEFAULT_WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";
const DEFAULT_CORPUS_URL: &str = "https://www.dicasdeviagem.com/inglaterra/";
const DEFAULT_CORPUS_CLASSES: &str =
    "postcontentwrap,pagetitleloading background-imaged loading-dark";
const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_RETRIEVER_TOP_K: usize = 4;
const DEFAULT_AGENT_MAX_ITERATIONS: usize = 15;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub chat_model: String,
    pub chat_temperature: f64,
    pub embedding_model: String,
    pub duckduckgo_url: String,
    pub wikipedia_api_url: String,
    pub corpus_url: String,
    /// Comma separated class filters; a filter may itself hold several
    /// space separated class names.
    pub corpus_classes: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retriever_top_k: usize,
    pub agent_max_iterations: usize,
    pub http_timeout_secs: u64,
    pub parallel_stages: bool,
    pub log_level: String,
}

impl Config {
    /// Reads settings from the process environment (and `.env` when present).
    /// `OPENAI_API_KEY` is the only required value.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .set_default("port", DEFAULT_PORT as i64)
            .and_then(|b| b.set_default("openai_base_url", DEFAULT_OPENAI_BASE_URL))
            .and_then(|b| b.set_default("chat_model", DEFAULT_CHAT_MODEL))
            .and_then(|b| b.set_default("chat_temperature", DEFAULT_CHAT_TEMPERATURE))
            .and_then(|b| b.set_default("embedding_model", DEFAULT_EMBEDDING_MODEL))
            .and_then(|b| b.set_default("duckduckgo_url", DEFAULT_DUCKDUCKGO_URL))
            .and_then(|b| b.set_default("wikipedia_api_url", DEFAULT_WIKIPEDIA_API_URL))
            .and_then(|b| b.set_default("corpus_url", DEFAULT_CORPUS_URL))
            .and_then(|b| b.set_default("corpus_classes", DEFAULT_CORPUS_CLASSES))
            .and_then(|b| b.set_default("chunk_size", DEFAULT_CHUNK_SIZE as i64))
            .and_then(|b| b.set_default("chunk_overlap", DEFAULT_CHUNK_OVERLAP as i64))
            .and_then(|b| b.set_default("retriever_top_k", DEFAULT_RETRIEVER_TOP_K as i64))
            .and_then(|b| {
                b.set_default("agent_max_iterations", DEFAULT_AGENT_MAX_ITERATIONS as i64)
            })
            .and_then(|b| b.set_default("http_timeout_secs", DEFAULT_HTTP_TIMEOUT_SECS as i64))
            .and_then(|b| b.set_default("parallel_stages", false))
            .and_then(|b| b.set_default("log_level", DEFAULT_LOG_LEVEL))
            .map_err(|e| AgentError::ConfigError(e.to_string()))?
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .map_err(|e| AgentError::ConfigError(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| AgentError::ConfigError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults around an explicit API key.
    pub fn new(openai_api_key: impl Into<String>) -> Self {
        Self {
            port: DEFAULT_PORT,
            openai_api_key: openai_api_key.into(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            chat_temperature: DEFAULT_CHAT_TEMPERATURE,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            duckduckgo_url: DEFAULT_DUCKDUCKGO_URL.to_string(),
            wikipedia_api_url: DEFAULT_WIKIPEDIA_API_URL.to_string(),
            corpus_url: DEFAULT_CORPUS_URL.to_string(),
            corpus_classes: DEFAULT_CORPUS_CLASSES.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            retriever_top_k: DEFAULT_RETRIEVER_TOP_K,
            agent_max_iterations: DEFAULT_AGENT_MAX_ITERATIONS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            parallel_stages: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    pub fn class_filters(&self) -> Vec<String> {
        self.corpus_classes
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.trim().is_empty() {
            return Err(AgentError::ConfigError(
                "OPENAI_API_KEY must be set".to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(AgentError::ConfigError(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(AgentError::ConfigError(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if self.retriever_top_k == 0 {
            return Err(AgentError::ConfigError(
                "retriever_top_k must be greater than 0".to_string(),
            ));
        }

        if self.agent_max_iterations == 0 {
            return Err(AgentError::ConfigError(
                "agent_max_iterations must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
