use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::chat;
use super::health;
use super::state::AppState;

/// Directory holding the single-page chat UI
pub const STATIC_DIR: &str = "public";

/// Create the router: health probes, the chat API and the static chat page
pub fn create_router(state: AppState) -> Router {
    let index = format!("{}/index.html", STATIC_DIR);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check))
        .route("/api/chat", post(chat::chat))
        .fallback_service(ServeDir::new(STATIC_DIR).fallback(ServeFile::new(index)))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
