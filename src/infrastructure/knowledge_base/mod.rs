//! Knowledge base control plane and retrieval implementations

pub mod bedrock;
mod in_memory;
mod retriever;

pub use bedrock::{
    BedrockControlPlane, BedrockControlPlaneSettings, ProvisionedResources, VectorIndexClient,
};
pub use in_memory::{InMemoryKnowledgeBaseService, NO_ANSWER};
pub use retriever::{foundation_model_arn, BedrockRetriever};
