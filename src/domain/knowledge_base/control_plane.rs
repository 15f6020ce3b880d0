//! Control plane trait for managed knowledge bases

use std::path::Path;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::entity::{IngestionJob, KnowledgeBaseDetails, KnowledgeBaseSummary};
use crate::domain::error::DomainError;

/// Remote operations needed to manage a knowledge base and its backing resources.
///
/// Implementations talk to a managed service; every call is one blocking round
/// trip from the caller's point of view and nothing is cached locally.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KnowledgeBaseControlPlane: Send + Sync {
    /// List up to `max_results` knowledge bases (single page)
    async fn list_knowledge_bases(
        &self,
        max_results: i32,
    ) -> Result<Vec<KnowledgeBaseSummary>, DomainError>;

    /// Fetch details for a knowledge base id
    async fn get_knowledge_base(&self, kb_id: &str) -> Result<KnowledgeBaseDetails, DomainError>;

    /// Provision a new knowledge base and its storage, access and search index
    /// infrastructure, returning the new knowledge base id
    async fn provision_knowledge_base(
        &self,
        name: &str,
        description: &str,
    ) -> Result<String, DomainError>;

    /// Ids of the data sources attached to a knowledge base
    async fn list_data_sources(&self, kb_id: &str) -> Result<Vec<String>, DomainError>;

    /// Bind the knowledge base to its document bucket, returning the data source id
    async fn create_data_source(&self, kb_id: &str, kb_name: &str) -> Result<String, DomainError>;

    async fn delete_data_source(&self, kb_id: &str, data_source_id: &str)
        -> Result<(), DomainError>;

    async fn start_ingestion_job(
        &self,
        kb_id: &str,
        data_source_id: &str,
    ) -> Result<IngestionJob, DomainError>;

    async fn get_ingestion_job(
        &self,
        kb_id: &str,
        data_source_id: &str,
        job_id: &str,
    ) -> Result<IngestionJob, DomainError>;

    /// Name of the object storage bucket the data source reads from
    async fn data_bucket_name(&self, kb_name: &str) -> Result<String, DomainError>;

    /// Upload a single local file to `bucket` under `key`
    async fn upload_object(&self, bucket: &str, key: &str, path: &Path)
        -> Result<(), DomainError>;

    async fn delete_knowledge_base(&self, kb_id: &str) -> Result<(), DomainError>;

    /// Empty and remove the document bucket
    async fn delete_bucket(&self, kb_name: &str) -> Result<(), DomainError>;

    /// Remove the execution role and the policies attached to it
    async fn delete_access_roles(&self, kb_name: &str) -> Result<(), DomainError>;

    /// Remove the vector collection and its security policies
    async fn delete_search_index_store(&self, kb_name: &str) -> Result<(), DomainError>;
}
