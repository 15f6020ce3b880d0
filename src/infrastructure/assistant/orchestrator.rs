//! Conversational orchestrator driving the model through tool use

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::prompt::SYSTEM_PROMPT;
use crate::domain::{
    Capability, CapabilityExecutor, ContentPart, ConversationTurn, ConversationalAssistant,
    DomainError, LlmProvider, LlmRequest, Message, MessageRole, TurnRole,
};

/// Generation settings for the assistant model
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub model_id: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Upper bound on model turns that request capabilities
    pub max_tool_rounds: usize,
}

impl AssistantSettings {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            temperature: 0.3,
            max_tokens: 2048,
            max_tool_rounds: 8,
        }
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Answers chat messages, invoking capabilities one at a time as the model asks
pub struct Assistant {
    provider: Arc<dyn LlmProvider>,
    executor: Arc<dyn CapabilityExecutor>,
    settings: AssistantSettings,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("provider", &self.provider.provider_name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Assistant {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        executor: Arc<dyn CapabilityExecutor>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            provider,
            executor,
            settings,
        }
    }

    fn request(&self, messages: &[Message]) -> LlmRequest {
        LlmRequest::builder()
            .system(SYSTEM_PROMPT)
            .messages(messages.iter().cloned())
            .tools(Capability::definitions())
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens)
            .build()
    }

    async fn run_tool(&self, id: String, name: &str, input: serde_json::Value) -> ContentPart {
        match Capability::from_tool_call(name, input) {
            Ok(capability) => ContentPart::ToolResult {
                tool_use_id: id,
                content: self.executor.invoke(capability).await,
                is_error: false,
            },
            Err(e) => {
                warn!(tool = %name, error = %e, "Rejected tool request");
                ContentPart::ToolResult {
                    tool_use_id: id,
                    content: e.to_string(),
                    is_error: true,
                }
            }
        }
    }
}

/// Turn chat history into a user-first, strictly alternating message list
/// ending with `message`.
///
/// Empty turns and leading assistant turns are dropped; consecutive turns from
/// the same role are merged.
pub fn conversation_messages(history: &[ConversationTurn], message: &str) -> Vec<Message> {
    let mut turns: Vec<(MessageRole, String)> = Vec::new();

    let incoming = history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                TurnRole::User => MessageRole::User,
                TurnRole::Assistant => MessageRole::Assistant,
            };
            (role, turn.content.trim())
        })
        .chain(std::iter::once((MessageRole::User, message.trim())));

    for (role, content) in incoming {
        if content.is_empty() {
            continue;
        }

        let same_role = matches!(turns.last(), Some((last_role, _)) if *last_role == role);

        if same_role {
            if let Some((_, text)) = turns.last_mut() {
                text.push_str("\n\n");
                text.push_str(content);
            }
        } else if !(turns.is_empty() && role == MessageRole::Assistant) {
            turns.push((role, content.to_string()));
        }
    }

    turns
        .into_iter()
        .map(|(role, content)| match role {
            MessageRole::Assistant => Message::assistant(content),
            _ => Message::user(content),
        })
        .collect()
}

#[async_trait]
impl ConversationalAssistant for Assistant {
    async fn respond(
        &self,
        history: &[ConversationTurn],
        message: &str,
    ) -> Result<String, DomainError> {
        if message.trim().is_empty() {
            return Err(DomainError::validation("Message must not be empty"));
        }

        let mut messages = conversation_messages(history, message);

        for round in 0..=self.settings.max_tool_rounds {
            let response = self
                .provider
                .chat(&self.settings.model_id, self.request(&messages))
                .await?;

            if !response.wants_tools() {
                debug!(rounds = round, "Assistant produced a final answer");
                return Ok(response.content().unwrap_or_default());
            }

            if round == self.settings.max_tool_rounds {
                break;
            }

            let tool_uses = response.message.tool_uses();
            messages.push(response.message);

            let mut results = Vec::with_capacity(tool_uses.len());
            for tool_use in tool_uses {
                info!(round, tool = %tool_use.name, "Model requested capability");
                results.push(
                    self.run_tool(tool_use.id, &tool_use.name, tool_use.input)
                        .await,
                );
            }
            messages.push(Message::user_with_parts(results));
        }

        Err(DomainError::internal(format!(
            "No answer after {} tool rounds",
            self.settings.max_tool_rounds
        )))
    }
}
