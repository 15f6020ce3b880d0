//! Intelligent search - routes a free-text question to the right source

use std::sync::Arc;

use tracing::{debug, warn};

use super::QueryDispatcher;
use crate::domain::routing::{accept_fallback_answer, classify, Route};
use crate::domain::DEFAULT_KNOWLEDGE_BASE_NAME;

/// Passages retrieved when the question is clearly about the university
pub const KNOWLEDGE_BASE_RESULT_LIMIT: u32 = 5;
/// Passages retrieved for the best-effort fallback
pub const GENERAL_RESULT_LIMIT: u32 = 3;

const TECHNICAL_REDIRECT: &str = "AWS Query Detected: This appears to be an AWS-related question. \
For comprehensive AWS documentation research, please consult the AWS documentation or ask the \
assistant directly.";

const GENERAL_GUIDANCE: &str = "General Query: I can help with school-related questions \
(academic calendar, rules, graduation) or AWS technical questions. Please be more specific about \
what you're looking for, or use the appropriate specialized tools.";

/// Keyword-routed search over the default knowledge base
pub struct IntelligentSearchService {
    dispatcher: Arc<QueryDispatcher>,
    kb_name: String,
}

impl std::fmt::Debug for IntelligentSearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntelligentSearchService")
            .field("kb_name", &self.kb_name)
            .finish()
    }
}

impl IntelligentSearchService {
    pub fn new(dispatcher: Arc<QueryDispatcher>) -> Self {
        Self {
            dispatcher,
            kb_name: DEFAULT_KNOWLEDGE_BASE_NAME.to_string(),
        }
    }

    pub fn with_knowledge_base_name(mut self, kb_name: impl Into<String>) -> Self {
        self.kb_name = kb_name.into();
        self
    }

    pub async fn search(&self, query: &str) -> String {
        let route = classify(query);
        debug!(?route, "Routed query");

        match route {
            Route::KnowledgeBase => self.search_knowledge_base(query).await,
            Route::TechnicalDoc => TECHNICAL_REDIRECT.to_string(),
            Route::General => self.search_general(query).await,
        }
    }

    async fn search_knowledge_base(&self, query: &str) -> String {
        match self
            .dispatcher
            .answer(&self.kb_name, query, KNOWLEDGE_BASE_RESULT_LIMIT)
            .await
        {
            Ok(Some(answer)) => format!("School Knowledge Base Response:\n\n{}", answer),
            Ok(None) => "School knowledge base is not available. Please create it first using \
                the manage_knowledge_base tool."
                .to_string(),
            Err(e) => format!("Error in intelligent search: {}", e),
        }
    }

    async fn search_general(&self, query: &str) -> String {
        match self
            .dispatcher
            .answer(&self.kb_name, query, GENERAL_RESULT_LIMIT)
            .await
        {
            Ok(Some(answer)) if accept_fallback_answer(&answer) => {
                format!("Knowledge Base Response:\n\n{}", answer)
            }
            Ok(_) => GENERAL_GUIDANCE.to_string(),
            Err(e) => {
                warn!(error = %e, "Fallback knowledge base query failed");
                GENERAL_GUIDANCE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::knowledge_base::{
        KnowledgeBaseStatus, KnowledgeBaseSummary, MockKnowledgeBaseControlPlane,
        MockRetrieveAndGenerate,
    };
    use crate::domain::DomainError;
    use crate::infrastructure::services::KnowledgeBaseLifecycleService;

    fn service(
        kb_exists: bool,
        retriever: MockRetrieveAndGenerate,
    ) -> IntelligentSearchService {
        let mut control_plane = MockKnowledgeBaseControlPlane::new();
        control_plane.expect_list_knowledge_bases().returning(move |_| {
            Ok(if kb_exists {
                vec![KnowledgeBaseSummary::new(
                    "schoolassistant",
                    "KB1",
                    KnowledgeBaseStatus::Active,
                )]
            } else {
                Vec::new()
            })
        });

        let lifecycle = Arc::new(KnowledgeBaseLifecycleService::new(Arc::new(control_plane)));
        IntelligentSearchService::new(Arc::new(QueryDispatcher::new(
            lifecycle,
            Arc::new(retriever),
        )))
    }

    #[tokio::test]
    async fn test_school_query_uses_knowledge_base() {
        let mut retriever = MockRetrieveAndGenerate::new();
        retriever
            .expect_retrieve_and_generate()
            .withf(|_, _, limit| *limit == KNOWLEDGE_BASE_RESULT_LIMIT)
            .returning(|_, _, _| Ok("Trimester starts Jan 6.".to_string()));

        let answer = service(true, retriever)
            .search("When does the trimester start?")
            .await;

        assert_eq!(
            answer,
            "School Knowledge Base Response:\n\nTrimester starts Jan 6."
        );
    }

    #[tokio::test]
    async fn test_school_query_without_knowledge_base() {
        let answer = service(false, MockRetrieveAndGenerate::new())
            .search("graduation gown pickup")
            .await;

        assert!(answer.contains("not available"));
        assert!(answer.contains("manage_knowledge_base"));
    }

    #[tokio::test]
    async fn test_technical_query_redirects() {
        let mut retriever = MockRetrieveAndGenerate::new();
        retriever.expect_retrieve_and_generate().never();

        let answer = service(true, retriever)
            .search("lambda function pricing")
            .await;

        assert!(answer.starts_with("AWS Query Detected"));
    }

    #[tokio::test]
    async fn test_general_query_accepts_long_answer() {
        let mut retriever = MockRetrieveAndGenerate::new();
        retriever
            .expect_retrieve_and_generate()
            .withf(|_, _, limit| *limit == GENERAL_RESULT_LIMIT)
            .returning(|_, _, _| {
                Ok("The library is open from 8am to 10pm on weekdays and 9am to 5pm on Saturdays."
                    .to_string())
            });

        let answer = service(true, retriever).search("library hours").await;

        assert!(answer.starts_with("Knowledge Base Response:"));
        assert!(answer.contains("10pm"));
    }

    #[tokio::test]
    async fn test_general_query_rejects_short_or_error_answer() {
        let mut retriever = MockRetrieveAndGenerate::new();
        retriever
            .expect_retrieve_and_generate()
            .returning(|_, _, _| Ok("No idea.".to_string()));
        assert_eq!(
            service(true, retriever).search("hello").await,
            GENERAL_GUIDANCE
        );

        let mut retriever = MockRetrieveAndGenerate::new();
        retriever
            .expect_retrieve_and_generate()
            .returning(|_, _, _| Err(DomainError::network("throttled")));
        assert_eq!(
            service(true, retriever).search("hello").await,
            GENERAL_GUIDANCE
        );
    }

    #[tokio::test]
    async fn test_general_query_rejects_long_answer_mentioning_error() {
        let mut retriever = MockRetrieveAndGenerate::new();
        retriever
            .expect_retrieve_and_generate()
            .withf(|_, _, limit| *limit == GENERAL_RESULT_LIMIT)
            .times(1)
            .returning(|_, _, _| {
                Ok("Report any ERROR in your transcript to the registry office within two weeks of release."
                    .to_string())
            });

        let answer = service(true, retriever).search("transcript corrections").await;

        assert_eq!(answer, GENERAL_GUIDANCE);
    }
}
