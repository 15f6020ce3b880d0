//! Knowledge Base domain - Managed knowledge base lifecycle and querying

mod control_plane;
mod entity;
mod query;
mod validation;

pub use control_plane::KnowledgeBaseControlPlane;
pub use entity::{
    DeleteOptions, IngestionJob, IngestionJobStatus, KnowledgeBaseDetails, KnowledgeBaseHandle,
    KnowledgeBaseStatus, KnowledgeBaseSummary, UploadReport,
};
pub use query::{DEFAULT_RESULT_LIMIT, QueryRequest, QueryResponse, RetrieveAndGenerate};
pub use validation::{
    KnowledgeBaseValidationError, validate_knowledge_base_name, validate_result_limit,
};

#[cfg(test)]
pub use control_plane::MockKnowledgeBaseControlPlane;
#[cfg(test)]
pub use query::MockRetrieveAndGenerate;
