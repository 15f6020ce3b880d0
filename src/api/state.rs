//! Application state shared by the HTTP handlers

use std::sync::Arc;

use crate::domain::ConversationalAssistant;

/// Built once at startup and cloned into every request
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<dyn ConversationalAssistant>,
}

impl AppState {
    pub fn new(assistant: Arc<dyn ConversationalAssistant>) -> Self {
        Self { assistant }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish()
    }
}
