// Travel itinerary pipeline: research -> relevant docs -> supervisor

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::agents::{
    CorpusLoader, HttpPageFetcher, RelevantDocsStep, ResearchAgent, SupervisorAgent,
    RESEARCH_STAGE, RETRIEVAL_STAGE, SUPERVISOR_STAGE,
};
use crate::config::Config;
use crate::error::Result;
use crate::llm::{http_client, OpenAiClient};
use crate::metrics::STAGE_DURATION;
use crate::models::{ChatCompletion, RetrievedDocuments};
use crate::splitter::RecursiveCharacterSplitter;
use crate::tools::{DuckDuckGoSearch, Tool, WikipediaQuery};

pub struct TravelAgent {
    researcher: ResearchAgent,
    relevant_docs: RelevantDocsStep,
    supervisor: SupervisorAgent,
    parallel_stages: bool,
}

impl TravelAgent {
    pub fn new(
        researcher: ResearchAgent,
        relevant_docs: RelevantDocsStep,
        supervisor: SupervisorAgent,
        parallel_stages: bool,
    ) -> Self {
        Self {
            researcher,
            relevant_docs,
            supervisor,
            parallel_stages,
        }
    }

    /// Wires the hosted services named in the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = http_client(config)?;
        let openai = Arc::new(OpenAiClient::new(client.clone(), config));

        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(DuckDuckGoSearch::new(client.clone(), &config.duckduckgo_url)),
            Arc::new(WikipediaQuery::new(client.clone(), &config.wikipedia_api_url)),
        ];

        let loader = CorpusLoader::new(
            Arc::new(HttpPageFetcher::new(client)),
            openai.clone(),
            &config.corpus_url,
            config.class_filters(),
            RecursiveCharacterSplitter::new(config.chunk_size, config.chunk_overlap),
            config.retriever_top_k,
        );

        Ok(Self::new(
            ResearchAgent::new(openai.clone(), tools, config.agent_max_iterations),
            RelevantDocsStep::new(loader),
            SupervisorAgent::new(openai),
            config.parallel_stages,
        ))
    }

    /// Runs the three stages and returns the supervisor's completion.
    pub async fn get_response(&self, query: &str) -> Result<ChatCompletion> {
        let (web_context, documents) = if self.parallel_stages {
            tokio::try_join!(self.research(query), self.retrieve(query))?
        } else {
            let web_context = self.research(query).await?;
            let documents = self.retrieve(query).await?;
            (web_context, documents)
        };

        timed(
            SUPERVISOR_STAGE,
            self.supervisor.supervise(query, &web_context, &documents),
        )
        .await
    }

    async fn research(&self, query: &str) -> Result<String> {
        timed(RESEARCH_STAGE, self.researcher.research(query)).await
    }

    async fn retrieve(&self, query: &str) -> Result<RetrievedDocuments> {
        timed(RETRIEVAL_STAGE, self.relevant_docs.retrieve(query)).await
    }
}

async fn timed<T, F>(stage: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let result = fut.await;
    let elapsed = started.elapsed();

    STAGE_DURATION
        .with_label_values(&[stage])
        .observe(elapsed.as_secs_f64());

    match &result {
        Ok(_) => info!("Stage {} finished in {:.2}s", stage, elapsed.as_secs_f64()),
        Err(e) => error!("Stage {} failed after {:.2}s: {}", stage, elapsed.as_secs_f64(), e),
    }
    result
}
