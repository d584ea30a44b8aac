// Corpus Loader: fetches the travel guide page and indexes its content regions

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AgentError, Result};
use crate::llm::Embedder;
use crate::models::{ChunkMetadata, DocumentChunk};
use crate::splitter::RecursiveCharacterSplitter;
use crate::vector_store::{InMemoryVectorStore, Retriever};

const SKIPPED_TAGS: [&str; 3] = ["script", "style", "noscript"];

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::UpstreamError {
                service: "corpus page",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.text().await?)
    }
}

pub struct CorpusLoader {
    fetcher: Arc<dyn PageFetcher>,
    embedder: Arc<dyn Embedder>,
    source_url: String,
    class_filters: Vec<String>,
    splitter: RecursiveCharacterSplitter,
    top_k: usize,
}

impl CorpusLoader {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        embedder: Arc<dyn Embedder>,
        source_url: impl Into<String>,
        class_filters: Vec<String>,
        splitter: RecursiveCharacterSplitter,
        top_k: usize,
    ) -> Self {
        Self {
            fetcher,
            embedder,
            source_url: source_url.into(),
            class_filters,
            splitter,
            top_k,
        }
    }

    /// Fetches the page and keeps only the configured content regions.
    pub async fn load_page(&self) -> Result<DocumentChunk> {
        info!("Corpus: fetching {}", self.source_url);
        let html = self.fetcher.fetch(&self.source_url).await?;

        let (title, text) = extract_regions(&html, &self.class_filters);
        debug!("Corpus: kept {} chars of page text", text.chars().count());

        Ok(DocumentChunk::new(
            text,
            ChunkMetadata {
                source: self.source_url.clone(),
                title,
                start_index: None,
            },
        ))
    }

    /// Fetch, split, embed and index. Nothing is cached between calls.
    pub async fn load(&self) -> Result<Retriever> {
        let page = self.load_page().await?;
        let chunks = self.splitter.split_documents(&[page]);
        info!("Corpus: split page into {} chunks", chunks.len());

        let store = InMemoryVectorStore::from_documents(chunks, self.embedder.clone()).await?;
        Ok(store.into_retriever(self.top_k))
    }
}

/// Returns the page `<title>` and the concatenated text of the outermost
/// elements matching any class filter.
fn extract_regions(html: &str, class_filters: &[String]) -> (Option<String>, String) {
    let doc = Html::parse_document(html);

    let title_sel = Selector::parse("title").unwrap();
    let title = doc
        .select(&title_sel)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let mut text = String::new();
    collect_matching(doc.root_element(), class_filters, &mut text);
    (title, text)
}

fn collect_matching(element: ElementRef<'_>, class_filters: &[String], out: &mut String) {
    for child in element.children().filter_map(ElementRef::wrap) {
        let class_attr = child.value().attr("class").unwrap_or("");
        if !class_attr.is_empty() && class_filters.iter().any(|f| class_matches(class_attr, f)) {
            collect_text(child, out);
        } else {
            collect_matching(child, class_filters, out);
        }
    }
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(el) = ElementRef::wrap(child) {
            if !SKIPPED_TAGS.contains(&el.value().name()) {
                collect_text(el, out);
            }
        }
    }
}

/// A single-class filter matches any class token; a multi-class filter must
/// equal the whole attribute value.
fn class_matches(class_attr: &str, filter: &str) -> bool {
    let filter_tokens: Vec<&str> = filter.split_whitespace().collect();
    match filter_tokens.as_slice() {
        [] => false,
        [single] => class_attr.split_whitespace().any(|c| c == *single),
        many => class_attr.split_whitespace().eq(many.iter().copied()),
    }
}
