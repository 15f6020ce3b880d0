//! Retrieval-augmented query types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::domain::error::DomainError;

/// Passages used when the caller does not say otherwise
pub const DEFAULT_RESULT_LIMIT: u32 = 5;

/// A single question against a named knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    pub target_knowledge_base_name: String,
    pub result_limit: u32,
}

impl QueryRequest {
    pub fn new(text: impl Into<String>, target_knowledge_base_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_knowledge_base_name: target_knowledge_base_name.into(),
            result_limit: DEFAULT_RESULT_LIMIT,
        }
    }
}

/// Generated answer, returned verbatim from the managed endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer_text: String,
}

impl QueryResponse {
    pub fn new(answer_text: impl Into<String>) -> Self {
        Self {
            answer_text: answer_text.into(),
        }
    }
}

/// Managed retrieval + generation endpoint
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RetrieveAndGenerate: Send + Sync {
    /// Retrieve up to `result_limit` passages from `kb_id` and generate an answer
    async fn retrieve_and_generate(
        &self,
        kb_id: &str,
        text: &str,
        result_limit: u32,
    ) -> Result<String, DomainError>;
}
