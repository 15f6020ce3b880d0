//! Knowledge base administration exposed to the assistant

use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::KnowledgeBaseDeployer;
use crate::config::KnowledgeBaseConfig;
use crate::domain::knowledge_base::DeleteOptions;
use crate::domain::DomainError;

/// Administrative action requested by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManageAction {
    Create,
    Delete,
    Status,
    List,
}

impl FromStr for ManageAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            "status" => Ok(Self::Status),
            "list" => Ok(Self::List),
            _ => Err(DomainError::validation(format!(
                "Unknown action '{}'. Supported actions: create, delete, status, list",
                s
            ))),
        }
    }
}

/// Create, delete, inspect and list knowledge bases, always answering with text
pub struct KnowledgeBaseManager {
    deployer: Arc<KnowledgeBaseDeployer>,
    config_path: PathBuf,
}

impl std::fmt::Debug for KnowledgeBaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBaseManager")
            .field("config_path", &self.config_path)
            .finish()
    }
}

impl KnowledgeBaseManager {
    pub fn new(deployer: Arc<KnowledgeBaseDeployer>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            deployer,
            config_path: config_path.into(),
        }
    }

    pub async fn manage(&self, action: &str, kb_name: &str, confirm: bool) -> String {
        let action = match action.parse::<ManageAction>() {
            Ok(action) => action,
            Err(DomainError::Validation { message }) => return message,
            Err(e) => return e.to_string(),
        };

        let result = match action {
            ManageAction::Create => self.create().await,
            ManageAction::Delete => self.delete(kb_name, confirm).await,
            ManageAction::Status => self.status(kb_name).await,
            ManageAction::List => self.list().await,
        };

        result.unwrap_or_else(|e| format!("Error managing knowledge base: {}", e))
    }

    async fn create(&self) -> Result<String, DomainError> {
        // Reloaded on every call so edits to the file take effect without a restart
        let config = KnowledgeBaseConfig::load(&self.config_path)?;
        let outcome = self
            .deployer
            .deploy(&config, &CancellationToken::new())
            .await?;

        Ok(match outcome.documents {
            Some(_) => format!(
                "Successfully created and populated knowledge base '{}' with ID: {}",
                config.name, outcome.handle.id
            ),
            None => format!(
                "Knowledge base created but documents directory not found: {}",
                config.document_directory_path.display()
            ),
        })
    }

    async fn delete(&self, kb_name: &str, confirm: bool) -> Result<String, DomainError> {
        if !confirm {
            return Ok(format!(
                "Deleting knowledge base '{}' removes it and its associated resources. \
                 Call again with confirm=true to proceed.",
                kb_name
            ));
        }

        info!(kb_name = %kb_name, "Deleting knowledge base on request");
        self.deployer
            .teardown(kb_name, DeleteOptions::default())
            .await?;

        Ok(format!(
            "Successfully deleted knowledge base '{}' and all associated resources",
            kb_name
        ))
    }

    async fn status(&self, kb_name: &str) -> Result<String, DomainError> {
        let details = match self.deployer.status(kb_name).await {
            Ok(details) => details,
            Err(e) if e.is_not_found() => {
                return Ok(format!("Knowledge base '{}' not found", kb_name));
            }
            Err(e) => return Err(e),
        };

        Ok(format!(
            "Knowledge Base Status for '{}':\n\n\
             ID: {}\n\
             Name: {}\n\
             Status: {}\n\
             Description: {}\n\
             Created: {}\n\
             Updated: {}",
            kb_name,
            details.id,
            details.name,
            details.status,
            details.description_or_default(),
            details.created_display(),
            details.updated_display()
        ))
    }

    async fn list(&self) -> Result<String, DomainError> {
        let summaries = self.deployer.lifecycle().list_all().await?;

        if summaries.is_empty() {
            return Ok("No knowledge bases found in your AWS account".to_string());
        }

        let mut output = String::from("Available Knowledge Bases:\n\n");
        for summary in summaries {
            let _ = writeln!(
                output,
                "• {} (ID: {}) - Status: {}",
                summary.name, summary.id, summary.status
            );
        }

        Ok(output)
    }
}
