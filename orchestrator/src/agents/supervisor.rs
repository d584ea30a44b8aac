// Supervisor Agent: merges web findings and guide excerpts into the itinerary

use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::llm::ChatModel;
use crate::models::{ChatCompletion, ChatMessage, DocumentChunk};

pub struct SupervisorAgent {
    llm: Arc<dyn ChatModel>,
}

impl SupervisorAgent {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }

    /// One completion over the filled template; the reply is not inspected.
    pub async fn supervise(
        &self,
        query: &str,
        web_context: &str,
        relevant_documents: &[DocumentChunk],
    ) -> Result<ChatCompletion> {
        info!(
            "Supervisor: drafting itinerary from {} chars of web context and {} documents",
            web_context.len(),
            relevant_documents.len()
        );

        let prompt = render_prompt(query, web_context, relevant_documents);
        let completion = self.llm.complete(&[ChatMessage::user(prompt)], &[]).await?;

        if let Some(usage) = &completion.usage {
            info!("Supervisor: {} tokens used", usage.total_tokens);
        }
        Ok(completion)
    }
}

fn render_prompt(query: &str, web_context: &str, relevant_documents: &[DocumentChunk]) -> String {
    format!(
        "Você é um gerente de uma agência de viagens. Sua resposta final deverá ser um roteiro de viagem completo e detalhado.
Utilize o contexto de eventos e preços de passagens, o input do usuário e também os documentos relevantes para elaborar o roteiro.
Contexto: {web_context}
Documento relevante: {documents}
Usuário: {query}
Assistente:",
        documents = format_documents(relevant_documents),
    )
}

fn format_documents(documents: &[DocumentChunk]) -> String {
    documents
        .iter()
        .map(|d| format!("[{}]\n{}", d.metadata.source, d.page_content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
