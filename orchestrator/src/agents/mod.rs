pub mod corpus;
pub mod researcher;
pub mod retriever;
pub mod supervisor;

pub use corpus::{CorpusLoader, HttpPageFetcher, PageFetcher};
pub use researcher::ResearchAgent;
pub use retriever::RelevantDocsStep;
pub use supervisor::SupervisorAgent;

// Stage names used in logs and metrics
pub const RESEARCH_STAGE: &str = "research";
pub const RETRIEVAL_STAGE: &str = "retrieval";
pub const SUPERVISOR_STAGE: &str = "supervisor";
