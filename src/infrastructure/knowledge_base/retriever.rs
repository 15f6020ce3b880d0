//! Retrieval-augmented generation against Amazon Bedrock Knowledge Bases

use async_trait::async_trait;
use aws_sdk_bedrockagentruntime::Client as BedrockAgentRuntimeClient;
use aws_smithy_types::error::display::DisplayErrorContext;
use tracing::debug;

use crate::domain::knowledge_base::RetrieveAndGenerate;
use crate::domain::DomainError;

/// ARN of an on-demand foundation model
pub fn foundation_model_arn(region: &str, model_id: &str) -> String {
    format!("arn:aws:bedrock:{}::foundation-model/{}", region, model_id)
}

/// Calls RetrieveAndGenerate with a fixed generation model
pub struct BedrockRetriever {
    client: BedrockAgentRuntimeClient,
    model_arn: String,
}

impl std::fmt::Debug for BedrockRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockRetriever")
            .field("model_arn", &self.model_arn)
            .finish()
    }
}

impl BedrockRetriever {
    pub fn new(aws_config: &aws_config::SdkConfig, region: &str, model_id: &str) -> Self {
        Self {
            client: BedrockAgentRuntimeClient::new(aws_config),
            model_arn: foundation_model_arn(region, model_id),
        }
    }

    pub fn model_arn(&self) -> &str {
        &self.model_arn
    }
}

fn build_error(e: impl std::fmt::Display) -> DomainError {
    DomainError::internal(format!("Invalid retrieval request: {}", e))
}

#[async_trait]
impl RetrieveAndGenerate for BedrockRetriever {
    async fn retrieve_and_generate(
        &self,
        kb_id: &str,
        text: &str,
        result_limit: u32,
    ) -> Result<String, DomainError> {
        use aws_sdk_bedrockagentruntime::types::{
            KnowledgeBaseRetrievalConfiguration, KnowledgeBaseRetrieveAndGenerateConfiguration,
            KnowledgeBaseVectorSearchConfiguration, RetrieveAndGenerateConfiguration,
            RetrieveAndGenerateInput, RetrieveAndGenerateType,
        };

        let number_of_results = i32::try_from(result_limit).map_err(|_| {
            DomainError::validation(format!("Result limit {} is out of range", result_limit))
        })?;

        let vector_config = KnowledgeBaseVectorSearchConfiguration::builder()
            .number_of_results(number_of_results)
            .build();

        let retrieval_config = KnowledgeBaseRetrievalConfiguration::builder()
            .vector_search_configuration(vector_config)
            .build();

        let kb_config = KnowledgeBaseRetrieveAndGenerateConfiguration::builder()
            .knowledge_base_id(kb_id)
            .model_arn(&self.model_arn)
            .retrieval_configuration(retrieval_config)
            .build()
            .map_err(build_error)?;

        let config = RetrieveAndGenerateConfiguration::builder()
            .r#type(RetrieveAndGenerateType::KnowledgeBase)
            .knowledge_base_configuration(kb_config)
            .build()
            .map_err(build_error)?;

        let input = RetrieveAndGenerateInput::builder()
            .text(text)
            .build()
            .map_err(build_error)?;

        let response = self
            .client
            .retrieve_and_generate()
            .input(input)
            .retrieve_and_generate_configuration(config)
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
                        "Retrieve and generate failed: {}",
                        DisplayErrorContext(&e)
                    ))
                }
            })?;

        let answer = response
            .output()
            .map(|output| output.text().to_string())
            .unwrap_or_default();

        debug!(kb_id = %kb_id, citations = response.citations().len(), "Generated answer");
        Ok(answer)
    }
}
