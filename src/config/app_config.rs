use serde::Deserialize;

use crate::domain::DEFAULT_KNOWLEDGE_BASE_NAME;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub aws: AwsConfig,
    pub knowledge_base: KnowledgeBaseSettings,
    pub models: ModelConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// AWS settings; the region falls back to the knowledge base config file
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AwsConfig {
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseSettings {
    /// Path of the YAML file describing the knowledge base to deploy
    pub config_path: String,
    /// Knowledge base searched when a caller names none
    pub default_name: String,
    pub embedding_model_id: String,
    pub embedding_dimensions: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model driving the conversational assistant
    pub assistant_model_id: String,
    /// Model generating answers from retrieved passages
    pub generation_model_id: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Upper bound on capability round trips per user message
    pub max_tool_rounds: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for KnowledgeBaseSettings {
    fn default() -> Self {
        Self {
            config_path: "kb_store/prereqs_config.yaml".to_string(),
            default_name: DEFAULT_KNOWLEDGE_BASE_NAME.to_string(),
            embedding_model_id: "amazon.titan-embed-text-v2:0".to_string(),
            embedding_dimensions: 1024,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            assistant_model_id: "amazon.nova-lite-v1:0".to_string(),
            generation_model_id: "amazon.nova-lite-v1:0".to_string(),
            temperature: 0.3,
            max_tokens: 2048,
            max_tool_rounds: 8,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 900,
            poll_interval_secs: 5,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Region from app config, then `fallback`, then us-east-1
    pub fn resolve_region(&self, fallback: Option<&str>) -> String {
        self.aws
            .region
            .clone()
            .or_else(|| fallback.map(str::to_string))
            .unwrap_or_else(|| "us-east-1".to_string())
    }
}
