//! Execution role and the IAM policies attached to it

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{describe, policies, BedrockControlPlane, ProvisionedResources};
use crate::domain::DomainError;

fn policy_arn(account_id: &str, policy_name: &str) -> String {
    format!("arn:aws:iam::{}:policy/{}", account_id, policy_name)
}

impl BedrockControlPlane {
    /// Create the role Bedrock assumes, with model and bucket access, returning its ARN
    pub(super) async fn ensure_execution_role(
        &self,
        resources: &ProvisionedResources,
        account_id: &str,
    ) -> Result<String, DomainError> {
        let role_arn = self.ensure_role(&resources.execution_role_name).await?;

        let attachments = [
            (
                &resources.foundation_model_policy_name,
                policies::foundation_model_policy(
                    &self.settings.region,
                    &self.settings.embedding_model_id,
                ),
            ),
            (
                &resources.s3_policy_name,
                policies::s3_policy(&resources.bucket_name, account_id),
            ),
        ];

        for (name, document) in attachments {
            let arn = self.ensure_policy(name, &document, account_id).await?;
            self.attach_policy(&resources.execution_role_name, &arn)
                .await?;
        }

        Ok(role_arn)
    }

    /// Grant the execution role API access to the vector collection
    pub(super) async fn attach_collection_policy(
        &self,
        resources: &ProvisionedResources,
        account_id: &str,
        collection_id: &str,
    ) -> Result<(), DomainError> {
        let document = policies::aoss_api_policy(&self.settings.region, account_id, collection_id);
        let arn = self
            .ensure_policy(&resources.aoss_policy_name, &document, account_id)
            .await?;

        self.attach_policy(&resources.execution_role_name, &arn)
            .await
    }

    async fn ensure_role(&self, role_name: &str) -> Result<String, DomainError> {
        let created = self
            .iam
            .create_role()
            .role_name(role_name)
            .assume_role_policy_document(policies::assume_role_policy().to_string())
            .description("Amazon Bedrock Knowledge Base execution role")
            .send()
            .await;

        match created {
            Ok(output) => {
                info!(role = %role_name, "Created execution role");
                output
                    .role()
                    .map(|role| role.arn().to_string())
                    .ok_or_else(|| {
                        DomainError::provisioning(format!("Role '{}' has no ARN", role_name))
                    })
            }
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_entity_already_exists_exception())
                    .unwrap_or(false) =>
            {
                debug!(role = %role_name, "Execution role already exists");

                let existing = self
                    .iam
                    .get_role()
                    .role_name(role_name)
                    .send()
                    .await
                    .map_err(|e| {
                        DomainError::provisioning(format!(
                            "Failed to read role '{}': {}",
                            role_name,
                            describe(&e)
                        ))
                    })?;

                existing
                    .role()
                    .map(|role| role.arn().to_string())
                    .ok_or_else(|| {
                        DomainError::provisioning(format!("Role '{}' has no ARN", role_name))
                    })
            }
            Err(e) => Err(DomainError::provisioning(format!(
                "Failed to create role '{}': {}",
                role_name,
                describe(&e)
            ))),
        }
    }

    async fn ensure_policy(
        &self,
        policy_name: &str,
        document: &Value,
        account_id: &str,
    ) -> Result<String, DomainError> {
        let created = self
            .iam
            .create_policy()
            .policy_name(policy_name)
            .policy_document(document.to_string())
            .send()
            .await;

        match created {
            Ok(output) => {
                info!(policy = %policy_name, "Created IAM policy");
                Ok(output
                    .policy()
                    .and_then(|policy| policy.arn())
                    .map(str::to_string)
                    .unwrap_or_else(|| policy_arn(account_id, policy_name)))
            }
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_entity_already_exists_exception())
                    .unwrap_or(false) =>
            {
                debug!(policy = %policy_name, "IAM policy already exists");
                Ok(policy_arn(account_id, policy_name))
            }
            Err(e) => Err(DomainError::provisioning(format!(
                "Failed to create policy '{}': {}",
                policy_name,
                describe(&e)
            ))),
        }
    }

    async fn attach_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), DomainError> {
        self.iam
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| {
                DomainError::provisioning(format!(
                    "Failed to attach '{}' to '{}': {}",
                    policy_arn,
                    role_name,
                    describe(&e)
                ))
            })?;

        Ok(())
    }

    /// Detach and delete every policy on the execution role, then the role itself
    pub(super) async fn delete_execution_role(
        &self,
        resources: &ProvisionedResources,
    ) -> Result<(), DomainError> {
        let role_name = &resources.execution_role_name;

        let attached = match self
            .iam
            .list_attached_role_policies()
            .role_name(role_name)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_no_such_entity_exception())
                    .unwrap_or(false) =>
            {
                warn!(role = %role_name, "Execution role not found, skipping deletion");
                return Ok(());
            }
            Err(e) => {
                return Err(DomainError::network(format!(
                    "Failed to list policies of '{}': {}",
                    role_name,
                    describe(&e)
                )))
            }
        };

        for arn in attached
            .attached_policies()
            .iter()
            .filter_map(|policy| policy.policy_arn())
        {
            self.iam
                .detach_role_policy()
                .role_name(role_name)
                .policy_arn(arn)
                .send()
                .await
                .map_err(|e| {
                    DomainError::network(format!(
                        "Failed to detach '{}': {}",
                        arn,
                        describe(&e)
                    ))
                })?;

            if let Err(e) = self.iam.delete_policy().policy_arn(arn).send().await {
                warn!(policy = %arn, error = %describe(&e), "Failed to delete IAM policy");
            }
        }

        self.iam
            .delete_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| {
                DomainError::network(format!(
                    "Failed to delete role '{}': {}",
                    role_name,
                    describe(&e)
                ))
            })?;

        info!(role = %role_name, "Deleted execution role and policies");
        Ok(())
    }
}
