//! OpenSearch Serverless vector collection and its security policies

use aws_sdk_opensearchserverless::types::{
    AccessPolicyType, CollectionStatus, CollectionType, SecurityPolicyType,
};
use tracing::{debug, info, warn};

use super::{describe, policies, BedrockControlPlane, ProvisionedResources};
use crate::domain::DomainError;

/// An active vector collection
#[derive(Debug, Clone)]
pub(super) struct VectorCollection {
    pub id: String,
    pub arn: String,
    pub endpoint: String,
}

impl BedrockControlPlane {
    /// Create policies and the collection, then wait until it is active
    pub(super) async fn ensure_vector_collection(
        &self,
        resources: &ProvisionedResources,
        principals: &[String],
    ) -> Result<VectorCollection, DomainError> {
        let collection = &resources.collection_name;

        self.ensure_security_policy(
            &resources.encryption_policy_name,
            SecurityPolicyType::Encryption,
            policies::encryption_policy(collection).to_string(),
        )
        .await?;
        self.ensure_security_policy(
            &resources.network_policy_name,
            SecurityPolicyType::Network,
            policies::network_policy(collection).to_string(),
        )
        .await?;
        self.ensure_access_policy(
            &resources.access_policy_name,
            policies::data_access_policy(collection, principals).to_string(),
        )
        .await?;

        match self
            .aoss
            .create_collection()
            .name(collection)
            .r#type(CollectionType::Vectorsearch)
            .send()
            .await
        {
            Ok(_) => info!(collection = %collection, "Creating vector collection"),
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_conflict_exception())
                    .unwrap_or(false) =>
            {
                debug!(collection = %collection, "Vector collection already exists")
            }
            Err(e) => {
                return Err(DomainError::provisioning(format!(
                    "Failed to create collection '{}': {}",
                    collection,
                    describe(&e)
                )))
            }
        }

        self.wait_for_collection(collection).await
    }

    async fn ensure_security_policy(
        &self,
        name: &str,
        policy_type: SecurityPolicyType,
        policy: String,
    ) -> Result<(), DomainError> {
        match self
            .aoss
            .create_security_policy()
            .name(name)
            .r#type(policy_type)
            .policy(policy)
            .send()
            .await
        {
            Ok(_) => {
                info!(policy = %name, "Created security policy");
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_conflict_exception())
                    .unwrap_or(false) =>
            {
                debug!(policy = %name, "Security policy already exists");
                Ok(())
            }
            Err(e) => Err(DomainError::provisioning(format!(
                "Failed to create security policy '{}': {}",
                name,
                describe(&e)
            ))),
        }
    }

    async fn ensure_access_policy(&self, name: &str, policy: String) -> Result<(), DomainError> {
        match self
            .aoss
            .create_access_policy()
            .name(name)
            .r#type(AccessPolicyType::Data)
            .policy(policy)
            .send()
            .await
        {
            Ok(_) => {
                info!(policy = %name, "Created data access policy");
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_conflict_exception())
                    .unwrap_or(false) =>
            {
                debug!(policy = %name, "Data access policy already exists");
                Ok(())
            }
            Err(e) => Err(DomainError::provisioning(format!(
                "Failed to create access policy '{}': {}",
                name,
                describe(&e)
            ))),
        }
    }

    async fn find_collection(
        &self,
        name: &str,
    ) -> Result<Option<(Option<VectorCollection>, CollectionStatus)>, DomainError> {
        let output = self
            .aoss
            .batch_get_collection()
            .names(name)
            .send()
            .await
            .map_err(|e| {
                DomainError::network(format!(
                    "Failed to read collection '{}': {}",
                    name,
                    describe(&e)
                ))
            })?;

        Ok(output.collection_details().first().map(|detail| {
            let collection = match (detail.id(), detail.arn(), detail.collection_endpoint()) {
                (Some(id), Some(arn), Some(endpoint)) => Some(VectorCollection {
                    id: id.to_string(),
                    arn: arn.to_string(),
                    endpoint: endpoint.to_string(),
                }),
                _ => None,
            };

            let status = detail
                .status()
                .cloned()
                .unwrap_or(CollectionStatus::Creating);

            (collection, status)
        }))
    }

    async fn wait_for_collection(&self, name: &str) -> Result<VectorCollection, DomainError> {
        for _ in 0..self.settings.max_polls() {
            match self.find_collection(name).await? {
                Some((Some(collection), CollectionStatus::Active)) => {
                    info!(collection = %name, id = %collection.id, "Vector collection is active");
                    return Ok(collection);
                }
                Some((_, CollectionStatus::Failed)) => {
                    return Err(DomainError::provisioning(format!(
                        "Collection '{}' failed to create",
                        name
                    )))
                }
                _ => tokio::time::sleep(self.settings.poll_interval).await,
            }
        }

        Err(DomainError::provisioning(format!(
            "Timed out waiting for collection '{}' to become active",
            name
        )))
    }

    /// Delete the collection and its policies, skipping anything already gone
    pub(super) async fn delete_vector_collection(
        &self,
        resources: &ProvisionedResources,
    ) -> Result<(), DomainError> {
        let name = &resources.collection_name;

        match self.find_collection(name).await? {
            Some((Some(collection), _)) => {
                self.aoss
                    .delete_collection()
                    .id(&collection.id)
                    .send()
                    .await
                    .map_err(|e| {
                        DomainError::network(format!(
                            "Failed to delete collection '{}': {}",
                            name,
                            describe(&e)
                        ))
                    })?;
                info!(collection = %name, "Deleted vector collection");
            }
            _ => warn!(collection = %name, "Vector collection not found, skipping deletion"),
        }

        if let Err(e) = self
            .aoss
            .delete_access_policy()
            .name(&resources.access_policy_name)
            .r#type(AccessPolicyType::Data)
            .send()
            .await
        {
            warn!(policy = %resources.access_policy_name, error = %describe(&e), "Failed to delete access policy");
        }

        for (policy, policy_type) in [
            (&resources.network_policy_name, SecurityPolicyType::Network),
            (&resources.encryption_policy_name, SecurityPolicyType::Encryption),
        ] {
            if let Err(e) = self
                .aoss
                .delete_security_policy()
                .name(policy)
                .r#type(policy_type)
                .send()
                .await
            {
                warn!(policy = %policy, error = %describe(&e), "Failed to delete security policy");
            }
        }

        Ok(())
    }
}
