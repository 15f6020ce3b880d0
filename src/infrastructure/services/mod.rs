//! Infrastructure services

mod deploy_service;
mod intelligent_search_service;
mod knowledge_base_service;
mod manage_service;
mod query_service;

pub use deploy_service::{DeployOutcome, KnowledgeBaseDeployer};
pub use intelligent_search_service::{
    IntelligentSearchService, GENERAL_RESULT_LIMIT, KNOWLEDGE_BASE_RESULT_LIMIT,
};
pub use knowledge_base_service::{KnowledgeBaseLifecycleService, SyncSettings, LIST_PAGE_SIZE};
pub use manage_service::{KnowledgeBaseManager, ManageAction};
pub use query_service::QueryDispatcher;
