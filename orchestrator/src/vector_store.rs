// In-memory cosine-similarity index, rebuilt per invocation.

use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AgentError, Result};
use crate::llm::Embedder;
use crate::models::{DocumentChunk, RetrievedDocuments};

pub struct InMemoryVectorStore {
    entries: Vec<(DocumentChunk, Vec<f32>)>,
    embedder: Arc<dyn Embedder>,
}

impl InMemoryVectorStore {
    /// Embeds every chunk and indexes it.
    pub async fn from_documents(
        documents: Vec<DocumentChunk>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed_documents(&texts).await?
        };

        if vectors.len() != documents.len() {
            return Err(AgentError::EmbeddingError(format!(
                "{} chunks but {} embeddings",
                documents.len(),
                vectors.len()
            )));
        }

        info!("Indexed {} chunks", documents.len());

        Ok(Self {
            entries: documents.into_iter().zip(vectors).collect(),
            embedder,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best `k` chunks for an already embedded query. Equal scores keep
    /// insertion order.
    pub fn similarity_search_by_vector(&self, query: &[f32], k: usize) -> Vec<(DocumentChunk, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (_, v))| (i, cosine_similarity(query, v)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| (self.entries[i].0.clone(), score))
            .collect()
    }

    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<(DocumentChunk, f32)>> {
        let query_vector = self.embedder.embed_query(query).await?;
        Ok(self.similarity_search_by_vector(&query_vector, k))
    }

    pub fn into_retriever(self, k: usize) -> Retriever {
        Retriever { store: self, k }
    }
}

/// Query-capable handle over an index with a fixed `k`.
pub struct Retriever {
    store: InMemoryVectorStore,
    k: usize,
}

impl Retriever {
    pub async fn invoke(&self, query: &str) -> Result<RetrievedDocuments> {
        let hits = self.store.similarity_search(query, self.k).await?;
        debug!(
            "Retrieved {} chunks (scores: {:?})",
            hits.len(),
            hits.iter().map(|(_, s)| *s).collect::<Vec<_>>()
        );
        Ok(hits.into_iter().map(|(doc, _)| doc).collect())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::ChunkMetadata;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    /// Embeds text as counts of a few keywords, so similarity is predictable.
    pub(crate) struct KeywordEmbedder;

    const KEYWORDS: [&str; 4] = ["londres", "paris", "museu", "pub"];

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    KEYWORDS
                        .iter()
                        .map(|k| lower.matches(k).count() as f32)
                        .collect()
                })
                .collect())
        }
    }

    fn chunk(text: &str) -> DocumentChunk {
        DocumentChunk::new(
            text,
            ChunkMetadata {
                source: "test".to_string(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn cosine_handles_degenerate_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn retriever_ranks_by_similarity_and_truncates() {
        let docs = vec![
            chunk("Um pub tradicional"),
            chunk("Museu britânico em Londres"),
            chunk("Londres, Londres e mais Londres"),
            chunk("Paris no verão"),
        ];
        let store = InMemoryVectorStore::from_documents(docs, Arc::new(KeywordEmbedder))
            .await
            .unwrap();
        assert_eq!(store.len(), 4);

        let retriever = store.into_retriever(2);
        let found = retriever.invoke("Londres").await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].page_content, "Londres, Londres e mais Londres");
        assert_eq!(found[1].page_content, "Museu britânico em Londres");
    }

    #[tokio::test]
    async fn ties_keep_corpus_order() {
        let docs = vec![chunk("pub A"), chunk("pub B"), chunk("pub C")];
        let store = InMemoryVectorStore::from_documents(docs, Arc::new(KeywordEmbedder))
            .await
            .unwrap();

        let first = store.similarity_search("pub", 3).await.unwrap();
        let second = store.similarity_search("pub", 3).await.unwrap();

        let order: Vec<_> = first.iter().map(|(d, _)| d.page_content.clone()).collect();
        assert_eq!(order, vec!["pub A", "pub B", "pub C"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_corpus_yields_no_documents() {
        let store = InMemoryVectorStore::from_documents(Vec::new(), Arc::new(KeywordEmbedder))
            .await
            .unwrap();
        assert!(store.is_empty());
        let found = store.into_retriever(4).invoke("Londres").await.unwrap();
        assert!(found.is_empty());
    }
}
