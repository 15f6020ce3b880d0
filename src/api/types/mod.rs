//! HTTP request, response and error types

pub mod chat;
pub mod error;
pub mod json;

pub use chat::{ChatReply, ChatRequest};
pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::Json;
