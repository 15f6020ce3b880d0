//! Capability executor backed by the knowledge base services

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::domain::capability::{
    IntelligentSearchInput, ManageKnowledgeBaseInput, SearchKnowledgeBaseInput, ThinkInput,
};
use crate::domain::knowledge_base::QueryRequest;
use crate::domain::{Capability, CapabilityExecutor};
use crate::infrastructure::services::{
    IntelligentSearchService, KnowledgeBaseManager, QueryDispatcher,
};

/// The tools the assistant can call
pub struct AssistantTools {
    dispatcher: Arc<QueryDispatcher>,
    intelligent_search: Arc<IntelligentSearchService>,
    manager: Arc<KnowledgeBaseManager>,
}

impl std::fmt::Debug for AssistantTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantTools").finish()
    }
}

impl AssistantTools {
    pub fn new(
        dispatcher: Arc<QueryDispatcher>,
        intelligent_search: Arc<IntelligentSearchService>,
        manager: Arc<KnowledgeBaseManager>,
    ) -> Self {
        Self {
            dispatcher,
            intelligent_search,
            manager,
        }
    }
}

#[async_trait]
impl CapabilityExecutor for AssistantTools {
    async fn invoke(&self, capability: Capability) -> String {
        info!(capability = capability.name(), "Invoking capability");

        match capability {
            Capability::SearchKnowledgeBase(SearchKnowledgeBaseInput {
                query,
                knowledge_base_name,
            }) => {
                self.dispatcher
                    .query(&QueryRequest::new(query, knowledge_base_name))
                    .await
                    .answer_text
            }
            Capability::IntelligentSearch(IntelligentSearchInput { query }) => {
                self.intelligent_search.search(&query).await
            }
            Capability::ManageKnowledgeBase(ManageKnowledgeBaseInput {
                action,
                kb_name,
                confirm,
            }) => self.manager.manage(&action, &kb_name, confirm).await,
            Capability::Think(ThinkInput { thought }) => {
                info!(thought = %thought, "Reasoning step");
                format!("Thought noted: {}", thought)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parameter_store::MockParameterStore;
    use crate::infrastructure::knowledge_base::InMemoryKnowledgeBaseService;
    use crate::infrastructure::services::{
        KnowledgeBaseDeployer, KnowledgeBaseLifecycleService, SyncSettings,
    };
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        tools: AssistantTools,
        deployer: Arc<KnowledgeBaseDeployer>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(InMemoryKnowledgeBaseService::new().with_ingestion_polls(1));
        let lifecycle = Arc::new(
            KnowledgeBaseLifecycleService::new(service.clone()).with_sync_settings(
                SyncSettings::new(Duration::from_secs(5), Duration::from_millis(5)),
            ),
        );

        let mut parameters = MockParameterStore::new();
        parameters.expect_put_parameter().returning(|_, _, _| Ok(()));
        parameters.expect_delete_parameter().returning(|_| Ok(()));

        let deployer = Arc::new(KnowledgeBaseDeployer::new(
            lifecycle.clone(),
            Arc::new(parameters),
        ));
        let dispatcher = Arc::new(QueryDispatcher::new(lifecycle, service));
        let intelligent_search = Arc::new(IntelligentSearchService::new(dispatcher.clone()));
        let manager = Arc::new(KnowledgeBaseManager::new(
            deployer.clone(),
            dir.path().join("prereqs_config.yaml"),
        ));

        Fixture {
            tools: AssistantTools::new(dispatcher, intelligent_search, manager),
            deployer,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_search_after_deploy() {
        let fixture = fixture();
        let docs = tempfile::tempdir().unwrap();
        std::fs::write(
            docs.path().join("calendar.txt"),
            "Academic calendar 2025\nJanuary trimester begins Jan 6\nMay trimester begins May 5",
        )
        .unwrap();

        let config = crate::config::KnowledgeBaseConfig {
            name: "schoolassistant".to_string(),
            description: "School docs".to_string(),
            document_directory_path: docs.path().to_path_buf(),
            region: "us-east-1".to_string(),
        };
        fixture
            .deployer
            .deploy(&config, &CancellationToken::new())
            .await
            .unwrap();

        let capability = Capability::from_tool_call(
            Capability::SEARCH_KNOWLEDGE_BASE,
            serde_json::json!({"query": "When does the January trimester start?"}),
        )
        .unwrap();
        let answer = fixture.tools.invoke(capability).await;

        assert!(answer.contains("January"), "unexpected answer: {}", answer);
        assert!(answer.contains('6'), "unexpected answer: {}", answer);
    }

    #[tokio::test]
    async fn test_search_unknown_knowledge_base() {
        let fixture = fixture();
        let answer = fixture
            .tools
            .invoke(Capability::SearchKnowledgeBase(SearchKnowledgeBaseInput {
                query: "fees".to_string(),
                knowledge_base_name: "other".to_string(),
            }))
            .await;

        assert!(answer.contains("not found"));
    }

    #[tokio::test]
    async fn test_manage_unknown_action() {
        let fixture = fixture();
        let answer = fixture
            .tools
            .invoke(Capability::ManageKnowledgeBase(ManageKnowledgeBaseInput {
                action: "rebuild".to_string(),
                kb_name: "schoolassistant".to_string(),
                confirm: false,
            }))
            .await;

        assert!(answer.starts_with("Unknown action 'rebuild'"));
    }

    #[tokio::test]
    async fn test_think_echoes_thought() {
        let fixture = fixture();
        let answer = fixture
            .tools
            .invoke(Capability::Think(ThinkInput {
                thought: "Check the calendar first".to_string(),
            }))
            .await;

        assert_eq!(answer, "Thought noted: Check the calendar first");
    }

    #[tokio::test]
    async fn test_intelligent_search_redirects_technical() {
        let fixture = fixture();
        let answer = fixture
            .tools
            .invoke(Capability::IntelligentSearch(IntelligentSearchInput {
                query: "How do I size an EC2 instance?".to_string(),
            }))
            .await;

        assert!(answer.starts_with("AWS Query Detected"));
    }
}
