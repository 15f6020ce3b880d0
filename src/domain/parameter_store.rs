//! Remote key/value parameter store

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::error::DomainError;

/// Parameter name under which a deployed knowledge base id is recorded
pub fn knowledge_base_id_parameter(kb_name: &str) -> String {
    format!("{}-kb-id", kb_name)
}

/// Write-once records that outlive the process
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Create or overwrite a string parameter
    async fn put_parameter(
        &self,
        name: &str,
        description: &str,
        value: &str,
    ) -> Result<(), DomainError>;

    async fn delete_parameter(&self, name: &str) -> Result<(), DomainError>;
}
