//! Query dispatcher - answers a question against a knowledge base by name

use std::sync::Arc;

use tracing::{debug, warn};

use super::KnowledgeBaseLifecycleService;
use crate::domain::knowledge_base::{
    validate_result_limit, QueryRequest, QueryResponse, RetrieveAndGenerate,
};
use crate::domain::DomainError;

/// Resolves knowledge base names and forwards questions to the retriever
pub struct QueryDispatcher {
    lifecycle: Arc<KnowledgeBaseLifecycleService>,
    retriever: Arc<dyn RetrieveAndGenerate>,
}

impl std::fmt::Debug for QueryDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryDispatcher").finish()
    }
}

impl QueryDispatcher {
    pub fn new(
        lifecycle: Arc<KnowledgeBaseLifecycleService>,
        retriever: Arc<dyn RetrieveAndGenerate>,
    ) -> Self {
        Self {
            lifecycle,
            retriever,
        }
    }

    /// Answer `text` from the knowledge base named `kb_name`.
    ///
    /// Returns `None` when no knowledge base has that name.
    pub async fn answer(
        &self,
        kb_name: &str,
        text: &str,
        result_limit: u32,
    ) -> Result<Option<String>, DomainError> {
        validate_result_limit(result_limit).map_err(|e| DomainError::validation(e.to_string()))?;

        let Some(kb_id) = self.lifecycle.resolve_id(kb_name).await? else {
            return Ok(None);
        };

        debug!(kb_name = %kb_name, kb_id = %kb_id, result_limit, "Querying knowledge base");

        self.retriever
            .retrieve_and_generate(&kb_id, text, result_limit)
            .await
            .map(Some)
    }

    /// Answer a query, rendering every failure into the response text
    pub async fn query(&self, request: &QueryRequest) -> QueryResponse {
        let name = &request.target_knowledge_base_name;

        match self
            .answer(name, &request.text, request.result_limit)
            .await
        {
            Ok(Some(answer)) => QueryResponse::new(answer),
            Ok(None) => QueryResponse::new(self.not_found_message(name).await),
            Err(e) => {
                warn!(kb_name = %name, error = %e, "Knowledge base query failed");
                QueryResponse::new(format!("Error searching knowledge base: {}", e))
            }
        }
    }

    async fn not_found_message(&self, name: &str) -> String {
        let available: Vec<String> = self
            .lifecycle
            .list_all()
            .await
            .map(|summaries| summaries.into_iter().map(|s| s.name).collect())
            .unwrap_or_default();

        if available.is_empty() {
            format!(
                "Knowledge base '{}' not found and no knowledge bases are available.",
                name
            )
        } else {
            format!(
                "Knowledge base '{}' not found. Available knowledge bases: {}",
                name,
                available.join(", ")
            )
        }
    }
}
