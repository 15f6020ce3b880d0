mod app_config;
mod knowledge_base;

pub use app_config::{
    AppConfig, AwsConfig, KnowledgeBaseSettings, LogFormat, LoggingConfig, ModelConfig,
    ServerConfig, SyncConfig,
};
pub use knowledge_base::{KnowledgeBaseConfig, DEFAULT_REGION};
