use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;

use crate::server::AppState;

mod chat;
mod config_info;
mod health;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health::api_health))
        .route("/api/config", get(config_info::get_config))
        .route("/api/chat", post(chat::chat))
        .route("/health", get(health::root_health))
}

pub async fn not_found(uri: Uri) -> impl IntoResponse {
    tracing::warn!("404 error: {}", uri);
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}
