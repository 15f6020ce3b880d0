//! Knowledge base, data source and ingestion job calls on the Bedrock Agent API

use aws_sdk_bedrockagent::types::{
    ChunkingConfiguration, ChunkingStrategy, DataSourceConfiguration, DataSourceType,
    FixedSizeChunkingConfiguration, KnowledgeBaseConfiguration, KnowledgeBaseStorageType,
    KnowledgeBaseType, OpenSearchServerlessConfiguration, OpenSearchServerlessFieldMapping,
    S3DataSourceConfiguration, StorageConfiguration, VectorIngestionConfiguration,
    VectorKnowledgeBaseConfiguration,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{describe, policies, BedrockControlPlane, ProvisionedResources};
use crate::domain::knowledge_base::{
    IngestionJob, IngestionJobStatus, KnowledgeBaseDetails, KnowledgeBaseStatus,
    KnowledgeBaseSummary,
};
use crate::domain::DomainError;

const CHUNK_MAX_TOKENS: i32 = 512;
const CHUNK_OVERLAP_PERCENTAGE: i32 = 20;
const DATA_SOURCE_PAGE_SIZE: i32 = 100;

fn to_chrono(dt: &aws_smithy_types::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

fn build_error(e: impl std::fmt::Display) -> DomainError {
    DomainError::provisioning(format!("Invalid knowledge base request: {}", e))
}

impl BedrockControlPlane {
    pub(super) async fn list_knowledge_base_summaries(
        &self,
        max_results: i32,
    ) -> Result<Vec<KnowledgeBaseSummary>, DomainError> {
        let output = self
            .agent
            .list_knowledge_bases()
            .max_results(max_results)
            .send()
            .await
            .map_err(|e| {
                DomainError::network(format!("Failed to list knowledge bases: {}", describe(&e)))
            })?;

        Ok(output
            .knowledge_base_summaries()
            .iter()
            .map(|kb| {
                KnowledgeBaseSummary::new(
                    kb.name(),
                    kb.knowledge_base_id(),
                    KnowledgeBaseStatus::from_remote(kb.status().as_str()),
                )
            })
            .collect())
    }

    pub(super) async fn fetch_knowledge_base(
        &self,
        kb_id: &str,
    ) -> Result<KnowledgeBaseDetails, DomainError> {
        let output = self
            .agent
            .get_knowledge_base()
            .knowledge_base_id(kb_id)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_resource_not_found_exception())
                    .unwrap_or(false)
                {
                    DomainError::not_found(format!("Knowledge base '{}' not found", kb_id))
                } else {
                    DomainError::network(format!(
                        "Failed to get knowledge base '{}': {}",
                        kb_id,
                        describe(&e)
                    ))
                }
            })?;

        let kb = output.knowledge_base().ok_or_else(|| {
            DomainError::not_found(format!("Knowledge base '{}' not found", kb_id))
        })?;

        Ok(KnowledgeBaseDetails {
            id: kb.knowledge_base_id().to_string(),
            name: kb.name().to_string(),
            status: KnowledgeBaseStatus::from_remote(kb.status().as_str()),
            description: kb.description().map(str::to_string),
            created_at: to_chrono(kb.created_at()),
            updated_at: to_chrono(kb.updated_at()),
        })
    }

    /// Create the knowledge base over the vector collection and wait until it is active
    pub(super) async fn create_knowledge_base(
        &self,
        name: &str,
        description: &str,
        role_arn: &str,
        collection_arn: &str,
        resources: &ProvisionedResources,
    ) -> Result<String, DomainError> {
        let embedding_model_arn = format!(
            "arn:aws:bedrock:{}::foundation-model/{}",
            self.settings.region, self.settings.embedding_model_id
        );

        let kb_config = KnowledgeBaseConfiguration::builder()
            .r#type(KnowledgeBaseType::Vector)
            .vector_knowledge_base_configuration(
                VectorKnowledgeBaseConfiguration::builder()
                    .embedding_model_arn(embedding_model_arn)
                    .build()
                    .map_err(build_error)?,
            )
            .build()
            .map_err(build_error)?;

        let field_mapping = OpenSearchServerlessFieldMapping::builder()
            .vector_field(policies::VECTOR_FIELD)
            .text_field(policies::TEXT_FIELD)
            .metadata_field(policies::METADATA_FIELD)
            .build()
            .map_err(build_error)?;

        let storage_config = StorageConfiguration::builder()
            .r#type(KnowledgeBaseStorageType::OpensearchServerless)
            .opensearch_serverless_configuration(
                OpenSearchServerlessConfiguration::builder()
                    .collection_arn(collection_arn)
                    .vector_index_name(&resources.index_name)
                    .field_mapping(field_mapping)
                    .build()
                    .map_err(build_error)?,
            )
            .build()
            .map_err(build_error)?;

        let output = self
            .agent
            .create_knowledge_base()
            .name(name)
            .description(description)
            .role_arn(role_arn)
            .knowledge_base_configuration(kb_config)
            .storage_configuration(storage_config)
            .send()
            .await
            .map_err(|e| {
                DomainError::provisioning(format!(
                    "Failed to create knowledge base '{}': {}",
                    name,
                    describe(&e)
                ))
            })?;

        let kb_id = output
            .knowledge_base()
            .map(|kb| kb.knowledge_base_id().to_string())
            .ok_or_else(|| {
                DomainError::provisioning(format!("No knowledge base returned for '{}'", name))
            })?;

        info!(kb_name = %name, kb_id = %kb_id, "Creating knowledge base");
        self.wait_for_knowledge_base(&kb_id).await?;

        Ok(kb_id)
    }

    async fn wait_for_knowledge_base(&self, kb_id: &str) -> Result<(), DomainError> {
        for _ in 0..self.settings.max_polls() {
            let details = self.fetch_knowledge_base(kb_id).await?;

            match details.status {
                KnowledgeBaseStatus::Active => return Ok(()),
                KnowledgeBaseStatus::Failed => {
                    return Err(DomainError::provisioning(format!(
                        "Knowledge base '{}' failed to create",
                        kb_id
                    )))
                }
                status => {
                    debug!(kb_id = %kb_id, status = %status, "Waiting for knowledge base");
                    tokio::time::sleep(self.settings.poll_interval).await;
                }
            }
        }

        Err(DomainError::provisioning(format!(
            "Timed out waiting for knowledge base '{}' to become active",
            kb_id
        )))
    }

    pub(super) async fn list_data_source_ids(
        &self,
        kb_id: &str,
    ) -> Result<Vec<String>, DomainError> {
        let output = self
            .agent
            .list_data_sources()
            .knowledge_base_id(kb_id)
            .max_results(DATA_SOURCE_PAGE_SIZE)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_resource_not_found_exception())
                    .unwrap_or(false)
                {
                    DomainError::not_found(format!("Knowledge base '{}' not found", kb_id))
                } else {
                    DomainError::network(format!(
                        "Failed to list data sources for '{}': {}",
                        kb_id,
                        describe(&e)
                    ))
                }
            })?;

        Ok(output
            .data_source_summaries()
            .iter()
            .map(|ds| ds.data_source_id().to_string())
            .collect())
    }

    pub(super) async fn create_s3_data_source(
        &self,
        kb_id: &str,
        kb_name: &str,
        bucket_name: &str,
    ) -> Result<String, DomainError> {
        let data_source_config = DataSourceConfiguration::builder()
            .r#type(DataSourceType::S3)
            .s3_configuration(
                S3DataSourceConfiguration::builder()
                    .bucket_arn(format!("arn:aws:s3:::{}", bucket_name))
                    .build()
                    .map_err(build_error)?,
            )
            .build()
            .map_err(build_error)?;

        let chunking = ChunkingConfiguration::builder()
            .chunking_strategy(ChunkingStrategy::FixedSize)
            .fixed_size_chunking_configuration(
                FixedSizeChunkingConfiguration::builder()
                    .max_tokens(CHUNK_MAX_TOKENS)
                    .overlap_percentage(CHUNK_OVERLAP_PERCENTAGE)
                    .build()
                    .map_err(build_error)?,
            )
            .build()
            .map_err(build_error)?;

        let output = self
            .agent
            .create_data_source()
            .knowledge_base_id(kb_id)
            .name(format!("{}-s3-source", kb_name))
            .data_source_configuration(data_source_config)
            .vector_ingestion_configuration(
                VectorIngestionConfiguration::builder()
                    .chunking_configuration(chunking)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                DomainError::provisioning(format!(
                    "Failed to create data source for '{}': {}",
                    kb_name,
                    describe(&e)
                ))
            })?;

        let ds_id = output
            .data_source()
            .map(|ds| ds.data_source_id().to_string())
            .ok_or_else(|| {
                DomainError::provisioning(format!("No data source returned for '{}'", kb_name))
            })?;

        info!(kb_id = %kb_id, data_source_id = %ds_id, bucket = %bucket_name, "Created data source");
        Ok(ds_id)
    }

    pub(super) async fn remove_data_source(
        &self,
        kb_id: &str,
        data_source_id: &str,
    ) -> Result<(), DomainError> {
        self.agent
            .delete_data_source()
            .knowledge_base_id(kb_id)
            .data_source_id(data_source_id)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_resource_not_found_exception())
                    .unwrap_or(false)
                {
                    DomainError::not_found(format!("Data source '{}' not found", data_source_id))
                } else {
                    DomainError::network(format!(
                        "Failed to delete data source '{}': {}",
                        data_source_id,
                        describe(&e)
                    ))
                }
            })?;

        Ok(())
    }

    pub(super) async fn begin_ingestion(
        &self,
        kb_id: &str,
        data_source_id: &str,
    ) -> Result<IngestionJob, DomainError> {
        let output = self
            .agent
            .start_ingestion_job()
            .knowledge_base_id(kb_id)
            .data_source_id(data_source_id)
            .send()
            .await
            .map_err(|e| {
                DomainError::sync(format!(
                    "Failed to start ingestion for '{}': {}",
                    kb_id,
                    describe(&e)
                ))
            })?;

        output
            .ingestion_job()
            .map(to_ingestion_job)
            .ok_or_else(|| DomainError::sync("Ingestion job was not returned"))
    }

    pub(super) async fn fetch_ingestion_job(
        &self,
        kb_id: &str,
        data_source_id: &str,
        job_id: &str,
    ) -> Result<IngestionJob, DomainError> {
        let output = self
            .agent
            .get_ingestion_job()
            .knowledge_base_id(kb_id)
            .data_source_id(data_source_id)
            .ingestion_job_id(job_id)
            .send()
            .await
            .map_err(|e| {
                DomainError::network(format!(
                    "Failed to read ingestion job '{}': {}",
                    job_id,
                    describe(&e)
                ))
            })?;

        output
            .ingestion_job()
            .map(to_ingestion_job)
            .ok_or_else(|| DomainError::sync(format!("Ingestion job '{}' not found", job_id)))
    }

    pub(super) async fn remove_knowledge_base(&self, kb_id: &str) -> Result<(), DomainError> {
        self.agent
            .delete_knowledge_base()
            .knowledge_base_id(kb_id)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_resource_not_found_exception())
                    .unwrap_or(false)
                {
                    DomainError::not_found(format!("Knowledge base '{}' not found", kb_id))
                } else {
                    DomainError::network(format!(
                        "Failed to delete knowledge base '{}': {}",
                        kb_id,
                        describe(&e)
                    ))
                }
            })?;

        info!(kb_id = %kb_id, "Deleted knowledge base");
        Ok(())
    }
}

fn to_ingestion_job(job: &aws_sdk_bedrockagent::types::IngestionJob) -> IngestionJob {
    IngestionJob::new(
        job.ingestion_job_id(),
        IngestionJobStatus::from_remote(job.status().as_str()),
    )
    .with_failure_reasons(job.failure_reasons().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_chrono() {
        let dt = aws_smithy_types::DateTime::from_secs(1_700_000_000);
        let converted = to_chrono(&dt).unwrap();
        assert_eq!(converted.timestamp(), 1_700_000_000);
    }
}
