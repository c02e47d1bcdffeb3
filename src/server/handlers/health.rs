use axum::Json;
use serde_json::{Value, json};

pub async fn api_health() -> Json<Value> {
    tracing::info!("Health check endpoint called");
    Json(json!({
        "status": "healthy",
        "message": "Agent chat relay is running",
    }))
}

/// Liveness probe outside the API prefix.
pub async fn root_health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
