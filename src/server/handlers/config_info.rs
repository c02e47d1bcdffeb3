use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct ConfigStatus {
    pub success: bool,
    pub has_deployment_id: bool,
    pub has_api_token: bool,
    pub has_endpoint: bool,
}

/// Reports which upstream settings are present, never their values.
pub async fn get_config(State(app_state): State<Arc<AppState>>) -> Json<ConfigStatus> {
    let upstream = &app_state.settings.upstream;

    tracing::info!(
        "API token present: {}, length: {}",
        upstream.has_api_token(),
        upstream.api_token.len()
    );
    tracing::info!(
        "Endpoint: '{}' (length: {})",
        upstream.endpoint,
        upstream.endpoint.len()
    );
    tracing::info!(
        "Deployment ID: '{}' (length: {})",
        upstream.deployment_id,
        upstream.deployment_id.len()
    );
    tracing::info!("Upstream config valid: {}", upstream.is_valid());

    Json(ConfigStatus {
        success: true,
        has_deployment_id: upstream.has_deployment_id(),
        has_api_token: upstream.has_api_token(),
        has_endpoint: upstream.has_endpoint(),
    })
}
