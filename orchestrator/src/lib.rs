//! Travel itinerary function: a ReAct web-research agent, retrieval over a
//! scraped travel guide, and a supervisor completion that merges both.

pub mod agents;
pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod splitter;
pub mod tools;
pub mod vector_store;

pub use config::Config;
pub use error::{AgentError, Result};
pub use pipeline::TravelAgent;
