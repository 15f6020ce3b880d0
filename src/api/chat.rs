//! Chat endpoint used by the web front end

use axum::extract::State;
use tracing::{debug, error};

use super::state::AppState;
use super::types::{ApiError, ChatReply, ChatRequest, Json};

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message must not be empty").with_param("message"));
    }

    debug!(history = request.history.len(), "Chat request");

    let reply = state
        .assistant
        .respond(&request.history, &request.message)
        .await
        .map_err(|e| {
            error!(error = %e, "Assistant failed to respond");
            ApiError::from(e)
        })?;

    Ok(Json(ChatReply { reply }))
}
