//! Deploy, inspect and tear down the configured knowledge base

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::KnowledgeBaseLifecycleService;
use crate::config::KnowledgeBaseConfig;
use crate::domain::knowledge_base::{
    DeleteOptions, KnowledgeBaseDetails, KnowledgeBaseHandle, UploadReport,
};
use crate::domain::parameter_store::knowledge_base_id_parameter;
use crate::domain::{DomainError, ParameterStore};

/// What a deployment did
#[derive(Debug, Clone, PartialEq)]
pub struct DeployOutcome {
    pub handle: KnowledgeBaseHandle,
    /// `None` when the document directory does not exist
    pub documents: Option<UploadReport>,
    /// Whether the id was recorded in the parameter store
    pub parameter_recorded: bool,
}

impl DeployOutcome {
    pub fn data_source_id(&self) -> &str {
        self.handle.data_source_id.as_deref().unwrap_or_default()
    }
}

/// Runs the create, upload, synchronize and record workflow
pub struct KnowledgeBaseDeployer {
    lifecycle: Arc<KnowledgeBaseLifecycleService>,
    parameters: Arc<dyn ParameterStore>,
}

impl std::fmt::Debug for KnowledgeBaseDeployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBaseDeployer").finish()
    }
}

impl KnowledgeBaseDeployer {
    pub fn new(
        lifecycle: Arc<KnowledgeBaseLifecycleService>,
        parameters: Arc<dyn ParameterStore>,
    ) -> Self {
        Self {
            lifecycle,
            parameters,
        }
    }

    pub fn lifecycle(&self) -> &Arc<KnowledgeBaseLifecycleService> {
        &self.lifecycle
    }

    /// Create or reuse the knowledge base, upload its documents and index them.
    ///
    /// A missing document directory is not an error: the knowledge base is
    /// left empty and nothing is recorded in the parameter store.
    pub async fn deploy(
        &self,
        config: &KnowledgeBaseConfig,
        cancel: &CancellationToken,
    ) -> Result<DeployOutcome, DomainError> {
        let handle = self
            .lifecycle
            .create_or_retrieve(&config.name, &config.description)
            .await?;

        let data_source_id = handle.data_source_id.clone().ok_or_else(|| {
            DomainError::provisioning(format!(
                "Knowledge base '{}' has no data source",
                config.name
            ))
        })?;

        if !config.document_directory_path.is_dir() {
            warn!(
                path = %config.document_directory_path.display(),
                "Document directory not found, knowledge base left empty"
            );
            return Ok(DeployOutcome {
                handle,
                documents: None,
                parameter_recorded: false,
            });
        }

        let bucket = self.lifecycle.data_bucket_name(&config.name).await?;
        let report = self
            .lifecycle
            .upload_directory(&config.document_directory_path, &bucket)
            .await?;

        self.lifecycle
            .synchronize(&handle.id, &data_source_id, cancel)
            .await?;

        let parameter = knowledge_base_id_parameter(&config.name);
        let parameter_recorded = match self
            .parameters
            .put_parameter(&parameter, &format!("{} kb id", config.name), &handle.id)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(parameter = %parameter, error = %e, "Could not record knowledge base id");
                false
            }
        };

        info!(kb_name = %config.name, kb_id = %handle.id, "Knowledge base deployed");

        Ok(DeployOutcome {
            handle,
            documents: Some(report),
            parameter_recorded,
        })
    }

    /// Details of the knowledge base named `kb_name`
    pub async fn status(&self, kb_name: &str) -> Result<KnowledgeBaseDetails, DomainError> {
        let kb_id = self.lifecycle.resolve_id(kb_name).await?.ok_or_else(|| {
            DomainError::not_found(format!("Knowledge base '{}' not found", kb_name))
        })?;

        self.lifecycle.get_details(&kb_id).await
    }

    /// Delete the knowledge base, then its parameter record.
    ///
    /// Returns whether the parameter was removed.
    pub async fn teardown(
        &self,
        kb_name: &str,
        options: DeleteOptions,
    ) -> Result<bool, DomainError> {
        self.lifecycle.delete(kb_name, options).await?;

        let parameter = knowledge_base_id_parameter(kb_name);
        match self.parameters.delete_parameter(&parameter).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(parameter = %parameter, error = %e, "Parameter may not have existed");
                Ok(false)
            }
        }
    }
}
