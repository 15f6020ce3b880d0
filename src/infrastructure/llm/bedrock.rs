//! AWS Bedrock LLM provider over the Converse API

use async_trait::async_trait;

use crate::domain::{
    ContentPart, DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, Message,
    MessageRole, ToolDefinition, Usage,
};
use crate::infrastructure::aws::{doc_to_json, json_to_document};

/// Converse call with system text split out of the message list
#[derive(Debug, Clone, PartialEq)]
pub struct ConverseRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub stop: Option<Vec<String>>,
}

/// Assistant turn returned by Converse
#[derive(Debug, Clone, PartialEq)]
pub struct ConverseReply {
    pub content: Vec<ContentPart>,
    pub stop_reason: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// AWS Bedrock client trait for dependency injection
#[async_trait]
pub trait BedrockClientTrait: Send + Sync + std::fmt::Debug {
    async fn converse(
        &self,
        model_id: &str,
        request: ConverseRequest,
    ) -> Result<ConverseReply, DomainError>;
}

/// AWS Bedrock API provider
#[derive(Debug)]
pub struct BedrockProvider<C: BedrockClientTrait> {
    client: C,
}

impl<C: BedrockClientTrait> BedrockProvider<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    fn build_converse_request(&self, request: LlmRequest) -> ConverseRequest {
        let (system, messages) = split_system_messages(&request.messages);

        ConverseRequest {
            system,
            messages: messages.into_iter().cloned().collect(),
            tools: request.tools,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: request.top_p,
            stop: request.stop,
        }
    }
}

#[async_trait]
impl<C: BedrockClientTrait> LlmProvider for BedrockProvider<C> {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let converse_request = self.build_converse_request(request);
        let reply = self.client.converse(model, converse_request).await?;

        let id = format!("bedrock-{}", uuid::Uuid::new_v4());
        let message = Message::assistant_with_parts(reply.content);

        Ok(LlmResponse::new(id, model.to_string(), message)
            .with_finish_reason(parse_stop_reason(&reply.stop_reason))
            .with_usage(Usage::new(reply.input_tokens, reply.output_tokens)))
    }

    fn provider_name(&self) -> &'static str {
        "bedrock"
    }
}

fn split_system_messages(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
    let mut system_content = String::new();
    let mut other_messages = Vec::new();

    for msg in messages {
        if msg.role == MessageRole::System {
            if let Some(text) = msg.content_text() {
                if !system_content.is_empty() {
                    system_content.push('\n');
                }

                system_content.push_str(&text);
            }
        } else {
            other_messages.push(msg);
        }
    }

    let system = if system_content.is_empty() {
        None
    } else {
        Some(system_content)
    };

    (system, other_messages)
}

fn parse_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        "guardrail_intervened" | "content_filtered" => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

/// Real AWS Bedrock client implementation
#[derive(Debug, Clone)]
pub struct BedrockClient {
    client: aws_sdk_bedrockruntime::Client,
}

impl BedrockClient {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        let client = aws_sdk_bedrockruntime::Client::new(config);
        Self { client }
    }

    pub fn from_client(client: aws_sdk_bedrockruntime::Client) -> Self {
        Self { client }
    }
}

fn build_error(e: impl std::fmt::Display) -> DomainError {
    DomainError::provider("bedrock", format!("Failed to build request: {}", e))
}

fn to_sdk_message(
    message: &Message,
) -> Result<aws_sdk_bedrockruntime::types::Message, DomainError> {
    use aws_sdk_bedrockruntime::types::{
        ContentBlock, ConversationRole, ToolResultBlock, ToolResultContentBlock,
        ToolResultStatus, ToolUseBlock,
    };

    let role = match message.role {
        MessageRole::Assistant => ConversationRole::Assistant,
        _ => ConversationRole::User,
    };

    let mut blocks = Vec::with_capacity(message.content.len());

    for part in &message.content {
        let block = match part {
            ContentPart::Text { text } => ContentBlock::Text(text.clone()),
            ContentPart::ToolUse { id, name, input } => ContentBlock::ToolUse(
                ToolUseBlock::builder()
                    .tool_use_id(id)
                    .name(name)
                    .input(json_to_document(input))
                    .build()
                    .map_err(build_error)?,
            ),
            ContentPart::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                let status = if *is_error {
                    ToolResultStatus::Error
                } else {
                    ToolResultStatus::Success
                };

                ContentBlock::ToolResult(
                    ToolResultBlock::builder()
                        .tool_use_id(tool_use_id)
                        .content(ToolResultContentBlock::Text(content.clone()))
                        .status(status)
                        .build()
                        .map_err(build_error)?,
                )
            }
        };

        blocks.push(block);
    }

    aws_sdk_bedrockruntime::types::Message::builder()
        .role(role)
        .set_content(Some(blocks))
        .build()
        .map_err(build_error)
}

fn to_sdk_tool_config(
    tools: &[ToolDefinition],
) -> Result<aws_sdk_bedrockruntime::types::ToolConfiguration, DomainError> {
    use aws_sdk_bedrockruntime::types::{
        Tool, ToolConfiguration, ToolInputSchema, ToolSpecification,
    };

    let specs = tools
        .iter()
        .map(|tool| {
            ToolSpecification::builder()
                .name(&tool.name)
                .description(&tool.description)
                .input_schema(ToolInputSchema::Json(json_to_document(&tool.input_schema)))
                .build()
                .map(Tool::ToolSpec)
                .map_err(build_error)
        })
        .collect::<Result<Vec<_>, _>>()?;

    ToolConfiguration::builder()
        .set_tools(Some(specs))
        .build()
        .map_err(build_error)
}

fn from_sdk_content(blocks: &[aws_sdk_bedrockruntime::types::ContentBlock]) -> Vec<ContentPart> {
    use aws_sdk_bedrockruntime::types::ContentBlock;

    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text(text) => Some(ContentPart::Text { text: text.clone() }),
            ContentBlock::ToolUse(tool_use) => Some(ContentPart::ToolUse {
                id: tool_use.tool_use_id().to_string(),
                name: tool_use.name().to_string(),
                input: doc_to_json(tool_use.input()),
            }),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl BedrockClientTrait for BedrockClient {
    async fn converse(
        &self,
        model_id: &str,
        request: ConverseRequest,
    ) -> Result<ConverseReply, DomainError> {
        use aws_sdk_bedrockruntime::error::DisplayErrorContext;
        use aws_sdk_bedrockruntime::types::{InferenceConfiguration, SystemContentBlock};

        let messages = request
            .messages
            .iter()
            .map(to_sdk_message)
            .collect::<Result<Vec<_>, _>>()?;

        let inference = InferenceConfiguration::builder()
            .set_temperature(request.temperature)
            .set_max_tokens(request.max_tokens.map(|t| t as i32))
            .set_top_p(request.top_p)
            .set_stop_sequences(request.stop.clone())
            .build();

        let mut call = self
            .client
            .converse()
            .model_id(model_id)
            .set_messages(Some(messages))
            .inference_config(inference);

        if let Some(system) = request.system {
            call = call.system(SystemContentBlock::Text(system));
        }

        if !request.tools.is_empty() {
            call = call.tool_config(to_sdk_tool_config(&request.tools)?);
        }

        let response = call.send().await.map_err(|e| {
            DomainError::provider("bedrock", format!("API error: {}", DisplayErrorContext(&e)))
        })?;

        let content = response
            .output()
            .and_then(|output| output.as_message().ok())
            .map(|message| from_sdk_content(message.content()))
            .unwrap_or_default();

        let (input_tokens, output_tokens) = response
            .usage()
            .map(|u| (u.input_tokens().max(0) as u32, u.output_tokens().max(0) as u32))
            .unwrap_or((0, 0));

        Ok(ConverseReply {
            content,
            stop_reason: response.stop_reason().as_str().to_string(),
            input_tokens,
            output_tokens,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use mock::MockBedrockClient;

    const MODEL_ID: &str = "amazon.nova-lite-v1:0";

    fn text_reply(text: &str) -> ConverseReply {
        ConverseReply {
            content: vec![ContentPart::Text {
                text: text.to_string(),
            }],
            stop_reason: "end_turn".to_string(),
            input_tokens: 15,
            output_tokens: 8,
        }
    }

    #[tokio::test]
    async fn test_bedrock_converse_chat() {
        let client = MockBedrockClient::new().with_reply(text_reply("Hello from Nova!"));
        let provider = BedrockProvider::new(client);

        let request = LlmRequest::builder()
            .system("You are helpful")
            .user("Hello!")
            .temperature(0.3)
            .build();

        let response = provider.chat(MODEL_ID, request).await.unwrap();

        assert_eq!(response.content(), Some("Hello from Nova!".to_string()));
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));

        let usage = response.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 15);
        assert_eq!(usage.completion_tokens, 8);

        let sent = provider.client.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].system.as_deref(), Some("You are helpful"));
        assert_eq!(sent[0].messages, vec![Message::user("Hello!")]);
        assert_eq!(sent[0].temperature, Some(0.3));
    }

    #[tokio::test]
    async fn test_bedrock_tool_use_reply() {
        let reply = ConverseReply {
            content: vec![ContentPart::ToolUse {
                id: "tooluse-1".to_string(),
                name: "intelligent_search".to_string(),
                input: serde_json::json!({"query": "graduation fees"}),
            }],
            stop_reason: "tool_use".to_string(),
            input_tokens: 20,
            output_tokens: 10,
        };

        let client = MockBedrockClient::new().with_reply(reply);
        let provider = BedrockProvider::new(client);

        let tool = ToolDefinition::new("intelligent_search", "search", serde_json::json!({}));
        let request = LlmRequest::builder()
            .user("How much is graduation?")
            .tools(vec![tool])
            .build();

        let response = provider.chat(MODEL_ID, request).await.unwrap();

        assert!(response.wants_tools());
        assert_eq!(response.message.tool_uses()[0].name, "intelligent_search");
        assert_eq!(provider.client.requests()[0].tools.len(), 1);
    }

    #[tokio::test]
    async fn test_bedrock_error_handling() {
        let client = MockBedrockClient::new().with_error("Access denied");
        let provider = BedrockProvider::new(client);

        let request = LlmRequest::builder().user("Hello!").build();

        let result = provider.chat(MODEL_ID, request).await;
        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[test]
    fn test_split_system_messages() {
        let messages = vec![
            Message::system("first"),
            Message::user("hi"),
            Message::system("second"),
        ];

        let (system, rest) = split_system_messages(&messages);
        assert_eq!(system.as_deref(), Some("first\nsecond"));
        assert_eq!(rest.len(), 1);

        let (system, _) = split_system_messages(&[Message::user("hi")]);
        assert!(system.is_none());
    }

    #[test]
    fn test_parse_stop_reason() {
        assert_eq!(parse_stop_reason("end_turn"), FinishReason::Stop);
        assert_eq!(parse_stop_reason("max_tokens"), FinishReason::Length);
        assert_eq!(parse_stop_reason("tool_use"), FinishReason::ToolCalls);
        assert_eq!(
            parse_stop_reason("guardrail_intervened"),
            FinishReason::ContentFilter
        );
        assert_eq!(parse_stop_reason("something_new"), FinishReason::Stop);
    }

    #[test]
    fn test_sdk_message_conversion() {
        let message = Message::user_with_parts(vec![ContentPart::ToolResult {
            tool_use_id: "t1".to_string(),
            content: "Not found".to_string(),
            is_error: true,
        }]);

        let sdk = to_sdk_message(&message).unwrap();
        assert_eq!(sdk.role().as_str(), "user");
        assert_eq!(sdk.content().len(), 1);
        assert!(sdk.content()[0].is_tool_result());
    }
}
