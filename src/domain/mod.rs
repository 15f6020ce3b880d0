//! Domain layer - Core business logic and entities

pub mod capability;
pub mod conversation;
pub mod error;
pub mod knowledge_base;
pub mod llm;
pub mod parameter_store;
pub mod routing;

pub use capability::{Capability, CapabilityExecutor, DEFAULT_KNOWLEDGE_BASE_NAME};
pub use conversation::{ConversationTurn, ConversationalAssistant, TurnRole};
pub use error::DomainError;
pub use knowledge_base::{
    DeleteOptions, IngestionJob, IngestionJobStatus, KnowledgeBaseControlPlane,
    KnowledgeBaseDetails, KnowledgeBaseHandle, KnowledgeBaseStatus, KnowledgeBaseSummary,
    KnowledgeBaseValidationError, QueryRequest, QueryResponse, RetrieveAndGenerate, UploadReport,
};
pub use llm::{
    ContentPart, FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, Message,
    MessageRole, ToolDefinition, ToolUse, Usage,
};
pub use parameter_store::ParameterStore;
pub use routing::Route;
