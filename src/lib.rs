//! Campus Assistant
//!
//! An academic assistant for KCA University backed by Amazon Bedrock:
//! - Knowledge base provisioning, document upload and ingestion
//! - Retrieval-augmented answers from the university documents
//! - A tool-using conversational assistant for the terminal and the web

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use api::state::AppState;
use config::KnowledgeBaseConfig;
use infrastructure::{
    assistant::{Assistant, AssistantSettings, AssistantTools},
    aws::load_sdk_config,
    knowledge_base::{BedrockControlPlane, BedrockControlPlaneSettings, BedrockRetriever},
    llm::{BedrockClient, BedrockProvider},
    parameter_store::SsmParameterStore,
    services::{
        IntelligentSearchService, KnowledgeBaseDeployer, KnowledgeBaseLifecycleService,
        KnowledgeBaseManager, QueryDispatcher, SyncSettings,
    },
};
use tracing::info;

/// Long-lived services shared by every entry point
#[derive(Debug, Clone)]
pub struct AppContext {
    pub region: String,
    pub knowledge_base_config_path: PathBuf,
    pub deployer: Arc<KnowledgeBaseDeployer>,
    pub assistant: Arc<Assistant>,
}

/// Build every service from configuration
pub async fn create_app_context(config: &AppConfig) -> anyhow::Result<AppContext> {
    let kb_config_path = PathBuf::from(&config.knowledge_base.config_path);

    // The knowledge base file may name a region; the app config wins when both do
    let kb_region = KnowledgeBaseConfig::load(&kb_config_path)
        .ok()
        .map(|kb| kb.region);
    let region = config.resolve_region(kb_region.as_deref());

    let sdk_config = load_sdk_config(&region).await;
    info!(region = %region, "Loaded AWS configuration");

    let poll_interval = Duration::from_secs(config.sync.poll_interval_secs);
    let control_plane = BedrockControlPlane::new(
        &sdk_config,
        BedrockControlPlaneSettings::new(&region)
            .with_embedding_model(
                &config.knowledge_base.embedding_model_id,
                config.knowledge_base.embedding_dimensions,
            )
            .with_poll_interval(poll_interval),
    )?;

    let lifecycle = Arc::new(
        KnowledgeBaseLifecycleService::new(Arc::new(control_plane)).with_sync_settings(
            SyncSettings::new(Duration::from_secs(config.sync.timeout_secs), poll_interval),
        ),
    );

    let retriever = Arc::new(BedrockRetriever::new(
        &sdk_config,
        &region,
        &config.models.generation_model_id,
    ));
    let parameters = Arc::new(SsmParameterStore::new(&sdk_config));

    let deployer = Arc::new(KnowledgeBaseDeployer::new(lifecycle.clone(), parameters));
    let dispatcher = Arc::new(QueryDispatcher::new(lifecycle, retriever));
    let intelligent_search = Arc::new(
        IntelligentSearchService::new(dispatcher.clone())
            .with_knowledge_base_name(&config.knowledge_base.default_name),
    );
    let manager = Arc::new(KnowledgeBaseManager::new(
        deployer.clone(),
        kb_config_path.clone(),
    ));
    let tools = Arc::new(AssistantTools::new(dispatcher, intelligent_search, manager));

    let provider = Arc::new(BedrockProvider::new(BedrockClient::new(&sdk_config)));
    let assistant = Arc::new(Assistant::new(
        provider,
        tools,
        AssistantSettings::new(&config.models.assistant_model_id)
            .with_temperature(config.models.temperature)
            .with_max_tokens(config.models.max_tokens)
            .with_max_tool_rounds(config.models.max_tool_rounds),
    ));

    Ok(AppContext {
        region,
        knowledge_base_config_path: kb_config_path,
        deployer,
        assistant,
    })
}

/// Create the HTTP application state
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let context = create_app_context(config).await?;
    Ok(AppState::new(context.assistant))
}
