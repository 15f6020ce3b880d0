//! Chat endpoint request and response bodies

use serde::{Deserialize, Serialize};

use crate::domain::ConversationTurn;

/// A message plus the turns the browser has shown so far
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_defaults_to_empty() {
        let request: ChatRequest = serde_json::from_str(r#"{"message":"Hi"}"#).unwrap();
        assert!(request.history.is_empty());
    }
}
