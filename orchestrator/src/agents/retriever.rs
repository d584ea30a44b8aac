// Relevant Docs Step: rebuilds the corpus index and runs one similarity query

use tracing::info;

use crate::agents::corpus::CorpusLoader;
use crate::error::Result;
use crate::models::RetrievedDocuments;

pub struct RelevantDocsStep {
    loader: CorpusLoader,
}

impl RelevantDocsStep {
    pub fn new(loader: CorpusLoader) -> Self {
        Self { loader }
    }

    pub async fn retrieve(&self, query: &str) -> Result<RetrievedDocuments> {
        info!("Retriever: searching corpus for: {}", query);

        let retriever = self.loader.load().await?;
        let documents = retriever.invoke(query).await?;

        info!("Retriever: {} relevant chunks", documents.len());
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::StaticPage;
    use crate::splitter::RecursiveCharacterSplitter;
    use crate::vector_store::tests::KeywordEmbedder;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn step() -> RelevantDocsStep {
        let page = r#"<div class="postcontentwrap">
            <p>Londres: o Museu Britânico.</p>

            <p>Um pub em Londres.</p>

            <p>Um dia em Paris.</p>
        </div>"#;
        RelevantDocsStep::new(CorpusLoader::new(
            Arc::new(StaticPage(page)),
            Arc::new(KeywordEmbedder),
            "https://example.com/guia",
            vec!["postcontentwrap".to_string()],
            RecursiveCharacterSplitter::new(50, 0),
            2,
        ))
    }

    #[tokio::test]
    async fn returns_top_k_in_similarity_order() {
        let docs = step().retrieve("museu em Londres").await.unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].page_content, "Londres: o Museu Britânico.");
        assert_eq!(docs[1].page_content, "Um pub em Londres.");
        assert_eq!(docs[0].metadata.source, "https://example.com/guia");
    }

    #[tokio::test]
    async fn ordering_is_deterministic_across_rebuilds() {
        let step = step();
        let first = step.retrieve("Londres").await.unwrap();
        let second = step.retrieve("Londres").await.unwrap();
        assert_eq!(first, second);
    }
}
