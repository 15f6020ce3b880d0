//! AWS Systems Manager Parameter Store

use async_trait::async_trait;
use aws_sdk_ssm::types::ParameterType;
use aws_smithy_types::error::display::DisplayErrorContext;
use tracing::info;

use crate::domain::{DomainError, ParameterStore};

/// String parameters in SSM
pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
}

impl std::fmt::Debug for SsmParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsmParameterStore").finish()
    }
}

impl SsmParameterStore {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_ssm::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn put_parameter(
        &self,
        name: &str,
        description: &str,
        value: &str,
    ) -> Result<(), DomainError> {
        self.client
            .put_parameter()
            .name(name)
            .description(description)
            .value(value)
            .r#type(ParameterType::String)
            .overwrite(true)
            .send()
            .await
            .map_err(|e| {
                DomainError::network(format!(
                    "Failed to store parameter '{}': {}",
                    name,
                    DisplayErrorContext(&e)
                ))
            })?;

        info!(parameter = %name, "Stored parameter");
        Ok(())
    }

    async fn delete_parameter(&self, name: &str) -> Result<(), DomainError> {
        match self.client.delete_parameter().name(name).send().await {
            Ok(_) => {
                info!(parameter = %name, "Deleted parameter");
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_parameter_not_found())
                    .unwrap_or(false) =>
            {
                Err(DomainError::not_found(format!(
                    "Parameter '{}' not found",
                    name
                )))
            }
            Err(e) => Err(DomainError::network(format!(
                "Failed to delete parameter '{}': {}",
                name,
                DisplayErrorContext(&e)
            ))),
        }
    }
}
