//! The university assistant: prompt, tools and the conversation loop

mod orchestrator;
mod prompt;
mod tools;

pub use orchestrator::{conversation_messages, Assistant, AssistantSettings};
pub use prompt::{EXAMPLE_QUERIES, SYSTEM_PROMPT};
pub use tools::AssistantTools;
