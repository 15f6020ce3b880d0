//! Amazon Bedrock Knowledge Bases control plane.
//!
//! A knowledge base is backed by an S3 bucket, an IAM execution role and an
//! OpenSearch Serverless vector collection. Every name is derived from
//! [`ProvisionedResources`], so nothing is remembered between calls.

mod access;
mod agent;
mod naming;
mod policies;
mod search_index;
mod storage;
mod vector_index;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_smithy_types::error::display::DisplayErrorContext;

use crate::domain::knowledge_base::{
    IngestionJob, KnowledgeBaseControlPlane, KnowledgeBaseDetails, KnowledgeBaseSummary,
};
use crate::domain::DomainError;

pub use naming::ProvisionedResources;
pub use vector_index::VectorIndexClient;

/// Settings for provisioning and waiting on remote resources
#[derive(Debug, Clone)]
pub struct BedrockControlPlaneSettings {
    pub region: String,
    pub embedding_model_id: String,
    pub embedding_dimensions: u32,
    /// Interval between status checks while a resource is being created
    pub poll_interval: Duration,
    /// Upper bound on waiting for a collection or knowledge base to become active
    pub resource_wait_timeout: Duration,
    /// Pause after index creation so the collection can serve it
    pub index_settle_time: Duration,
}

impl BedrockControlPlaneSettings {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            embedding_model_id: "amazon.titan-embed-text-v2:0".to_string(),
            embedding_dimensions: 1024,
            poll_interval: Duration::from_secs(5),
            resource_wait_timeout: Duration::from_secs(600),
            index_settle_time: Duration::from_secs(30),
        }
    }

    pub fn with_embedding_model(mut self, model_id: impl Into<String>, dimensions: u32) -> Self {
        self.embedding_model_id = model_id.into();
        self.embedding_dimensions = dimensions;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn max_polls(&self) -> u32 {
        let interval = self.poll_interval.as_millis().max(1);
        (self.resource_wait_timeout.as_millis() / interval).max(1) as u32
    }
}

/// Caller identity as reported by STS
#[derive(Debug, Clone)]
struct CallerIdentity {
    account_id: String,
    arn: String,
}

/// Control plane backed by the Bedrock Agent, S3, IAM, OpenSearch Serverless and STS APIs
pub struct BedrockControlPlane {
    agent: aws_sdk_bedrockagent::Client,
    s3: aws_sdk_s3::Client,
    iam: aws_sdk_iam::Client,
    aoss: aws_sdk_opensearchserverless::Client,
    sts: aws_sdk_sts::Client,
    vector_index: VectorIndexClient,
    settings: BedrockControlPlaneSettings,
}

impl std::fmt::Debug for BedrockControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockControlPlane")
            .field("settings", &self.settings)
            .finish()
    }
}

impl BedrockControlPlane {
    pub fn new(
        sdk_config: &aws_config::SdkConfig,
        settings: BedrockControlPlaneSettings,
    ) -> Result<Self, DomainError> {
        let credentials = sdk_config.credentials_provider().ok_or_else(|| {
            DomainError::configuration("No AWS credentials provider is configured")
        })?;

        Ok(Self {
            agent: aws_sdk_bedrockagent::Client::new(sdk_config),
            s3: aws_sdk_s3::Client::new(sdk_config),
            iam: aws_sdk_iam::Client::new(sdk_config),
            aoss: aws_sdk_opensearchserverless::Client::new(sdk_config),
            sts: aws_sdk_sts::Client::new(sdk_config),
            vector_index: VectorIndexClient::new(credentials, settings.region.clone()),
            settings,
        })
    }

    async fn caller_identity(&self) -> Result<CallerIdentity, DomainError> {
        let output = self.sts.get_caller_identity().send().await.map_err(|e| {
            DomainError::network(format!("Failed to resolve caller identity: {}", describe(&e)))
        })?;

        match (output.account(), output.arn()) {
            (Some(account_id), Some(arn)) => Ok(CallerIdentity {
                account_id: account_id.to_string(),
                arn: arn.to_string(),
            }),
            _ => Err(DomainError::network(
                "Caller identity response is missing the account or ARN",
            )),
        }
    }

    async fn resources_for(&self, kb_name: &str) -> Result<ProvisionedResources, DomainError> {
        let identity = self.caller_identity().await?;
        Ok(ProvisionedResources::new(
            kb_name,
            &self.settings.region,
            &identity.account_id,
        ))
    }
}

/// Full error chain of an SDK failure
fn describe<E: std::error::Error>(err: &E) -> String {
    DisplayErrorContext(err).to_string()
}

#[async_trait]
impl KnowledgeBaseControlPlane for BedrockControlPlane {
    async fn list_knowledge_bases(
        &self,
        max_results: i32,
    ) -> Result<Vec<KnowledgeBaseSummary>, DomainError> {
        self.list_knowledge_base_summaries(max_results).await
    }

    async fn get_knowledge_base(&self, kb_id: &str) -> Result<KnowledgeBaseDetails, DomainError> {
        self.fetch_knowledge_base(kb_id).await
    }

    async fn provision_knowledge_base(
        &self,
        name: &str,
        description: &str,
    ) -> Result<String, DomainError> {
        let identity = self.caller_identity().await?;
        let resources = ProvisionedResources::new(name, &self.settings.region, &identity.account_id);

        self.ensure_bucket(&resources.bucket_name).await?;
        let role_arn = self
            .ensure_execution_role(&resources, &identity.account_id)
            .await?;
        let collection = self
            .ensure_vector_collection(&resources, &[identity.arn.clone(), role_arn.clone()])
            .await?;
        self.attach_collection_policy(&resources, &identity.account_id, &collection.id)
            .await?;

        self.vector_index
            .create_index(
                &collection.endpoint,
                &resources.index_name,
                &policies::vector_index_body(self.settings.embedding_dimensions),
            )
            .await?;
        tokio::time::sleep(self.settings.index_settle_time).await;

        self.create_knowledge_base(name, description, &role_arn, &collection.arn, &resources)
            .await
    }

    async fn list_data_sources(&self, kb_id: &str) -> Result<Vec<String>, DomainError> {
        self.list_data_source_ids(kb_id).await
    }

    async fn create_data_source(&self, kb_id: &str, kb_name: &str) -> Result<String, DomainError> {
        let resources = self.resources_for(kb_name).await?;
        self.create_s3_data_source(kb_id, kb_name, &resources.bucket_name)
            .await
    }

    async fn delete_data_source(
        &self,
        kb_id: &str,
        data_source_id: &str,
    ) -> Result<(), DomainError> {
        self.remove_data_source(kb_id, data_source_id).await
    }

    async fn start_ingestion_job(
        &self,
        kb_id: &str,
        data_source_id: &str,
    ) -> Result<IngestionJob, DomainError> {
        self.begin_ingestion(kb_id, data_source_id).await
    }

    async fn get_ingestion_job(
        &self,
        kb_id: &str,
        data_source_id: &str,
        job_id: &str,
    ) -> Result<IngestionJob, DomainError> {
        self.fetch_ingestion_job(kb_id, data_source_id, job_id).await
    }

    async fn data_bucket_name(&self, kb_name: &str) -> Result<String, DomainError> {
        Ok(self.resources_for(kb_name).await?.bucket_name)
    }

    async fn upload_object(&self, bucket: &str, key: &str, path: &Path) -> Result<(), DomainError> {
        self.put_file(bucket, key, path).await
    }

    async fn delete_knowledge_base(&self, kb_id: &str) -> Result<(), DomainError> {
        self.remove_knowledge_base(kb_id).await
    }

    async fn delete_bucket(&self, kb_name: &str) -> Result<(), DomainError> {
        let resources = self.resources_for(kb_name).await?;
        self.empty_and_delete_bucket(&resources.bucket_name).await
    }

    async fn delete_access_roles(&self, kb_name: &str) -> Result<(), DomainError> {
        let resources = self.resources_for(kb_name).await?;
        self.delete_execution_role(&resources).await
    }

    async fn delete_search_index_store(&self, kb_name: &str) -> Result<(), DomainError> {
        let resources = self.resources_for(kb_name).await?;
        self.delete_vector_collection(&resources).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_polls() {
        let settings = BedrockControlPlaneSettings::new("us-east-1")
            .with_poll_interval(Duration::from_secs(5));
        assert_eq!(settings.max_polls(), 120);

        let mut tiny = settings.clone();
        tiny.resource_wait_timeout = Duration::from_millis(1);
        assert_eq!(tiny.max_polls(), 1);
    }

    #[test]
    fn test_settings_builder() {
        let settings = BedrockControlPlaneSettings::new("eu-west-1")
            .with_embedding_model("cohere.embed-english-v3", 1024);
        assert_eq!(settings.region, "eu-west-1");
        assert_eq!(settings.embedding_model_id, "cohere.embed-english-v3");
    }
}
