//! LLM provider implementations

mod bedrock;

pub use bedrock::{BedrockClient, BedrockClientTrait, BedrockProvider, ConverseReply, ConverseRequest};

#[cfg(test)]
pub use bedrock::mock::MockBedrockClient;
