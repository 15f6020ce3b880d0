//! Typed capabilities the assistant may invoke while answering

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[cfg(test)]
use mockall::automock;

use super::llm::{ToolDefinition, ToolUse};
use super::DomainError;

pub const DEFAULT_KNOWLEDGE_BASE_NAME: &str = "schoolassistant";

fn default_kb_name() -> String {
    DEFAULT_KNOWLEDGE_BASE_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchKnowledgeBaseInput {
    pub query: String,
    #[serde(default = "default_kb_name", alias = "kb_name")]
    pub knowledge_base_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligentSearchInput {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManageKnowledgeBaseInput {
    pub action: String,
    #[serde(default = "default_kb_name")]
    pub kb_name: String,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkInput {
    pub thought: String,
}

/// A capability call with validated input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "input", rename_all = "snake_case")]
pub enum Capability {
    SearchKnowledgeBase(SearchKnowledgeBaseInput),
    IntelligentSearch(IntelligentSearchInput),
    ManageKnowledgeBase(ManageKnowledgeBaseInput),
    Think(ThinkInput),
}

impl Capability {
    pub const SEARCH_KNOWLEDGE_BASE: &'static str = "search_knowledge_base";
    pub const INTELLIGENT_SEARCH: &'static str = "intelligent_search";
    pub const MANAGE_KNOWLEDGE_BASE: &'static str = "manage_knowledge_base";
    pub const THINK: &'static str = "think";

    pub fn name(&self) -> &'static str {
        match self {
            Self::SearchKnowledgeBase(_) => Self::SEARCH_KNOWLEDGE_BASE,
            Self::IntelligentSearch(_) => Self::INTELLIGENT_SEARCH,
            Self::ManageKnowledgeBase(_) => Self::MANAGE_KNOWLEDGE_BASE,
            Self::Think(_) => Self::THINK,
        }
    }

    /// Decode a model tool request into a typed capability
    pub fn from_tool_call(name: &str, input: Value) -> Result<Self, DomainError> {
        let tagged = json!({ "name": name, "input": input });
        serde_json::from_value(tagged).map_err(|e| {
            DomainError::validation(format!("Invalid input for capability '{}': {}", name, e))
        })
    }

    pub fn from_tool_use(tool_use: &ToolUse) -> Result<Self, DomainError> {
        Self::from_tool_call(&tool_use.name, tool_use.input.clone())
    }

    /// Tool definitions advertised to the model
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new(
                Self::SEARCH_KNOWLEDGE_BASE,
                "Search a named knowledge base and return a generated answer grounded in its documents.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The question to answer"
                        },
                        "knowledge_base_name": {
                            "type": "string",
                            "description": "Name of the knowledge base to search",
                            "default": DEFAULT_KNOWLEDGE_BASE_NAME
                        }
                    },
                    "required": ["query"]
                }),
            ),
            ToolDefinition::new(
                Self::INTELLIGENT_SEARCH,
                "Answer a question by routing it to the school knowledge base, the technical documentation, or a general search.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The question to answer"
                        }
                    },
                    "required": ["query"]
                }),
            ),
            ToolDefinition::new(
                Self::MANAGE_KNOWLEDGE_BASE,
                "Administer a knowledge base. Actions: create, delete, status, list. Delete requires confirm=true.",
                json!({
                    "type": "object",
                    "properties": {
                        "action": {
                            "type": "string",
                            "enum": ["create", "delete", "status", "list"]
                        },
                        "kb_name": {
                            "type": "string",
                            "default": DEFAULT_KNOWLEDGE_BASE_NAME
                        },
                        "confirm": {
                            "type": "boolean",
                            "default": false
                        }
                    },
                    "required": ["action"]
                }),
            ),
            ToolDefinition::new(
                Self::THINK,
                "Reflect on a problem step by step before answering.",
                json!({
                    "type": "object",
                    "properties": {
                        "thought": {
                            "type": "string",
                            "description": "The problem or reasoning to reflect on"
                        }
                    },
                    "required": ["thought"]
                }),
            ),
        ]
    }
}

/// Runs capabilities on behalf of the assistant.
///
/// Failures are rendered into the returned text so the model can read them.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CapabilityExecutor: Send + Sync {
    async fn invoke(&self, capability: Capability) -> String;
}
