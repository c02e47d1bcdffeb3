use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::RelayError;
use crate::server::AppState;
use crate::server::streaming::{ChatRequest, RelayTiming, relay, sse_response};

const MESSAGE_REQUIRED: &str = "Message is required";

#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub deployment_id: Option<String>,
    /// Defaults to the SSE relay; `false` asks for a single JSON reply.
    #[serde(default)]
    pub stream: Option<bool>,
}

impl ChatPayload {
    fn into_request(self) -> Result<(ChatRequest, bool), RelayError> {
        let message = self
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| RelayError::BadRequest(MESSAGE_REQUIRED.into()))?;
        let deployment_id = self
            .deployment_id
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok((
            ChatRequest {
                message,
                deployment_id,
            },
            self.stream.unwrap_or(true),
        ))
    }
}

pub async fn chat(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ChatPayload>, JsonRejection>,
) -> Result<Response, RelayError> {
    let payload = match payload {
        Ok(Json(p)) => p,
        Err(rejection) => {
            tracing::error!("Invalid chat request body: {}", rejection);
            return Err(RelayError::BadRequest(MESSAGE_REQUIRED.into()));
        }
    };
    let (request, stream) = payload.into_request().inspect_err(|_| {
        tracing::error!("Invalid request: no message provided");
    })?;

    if stream {
        let timing = RelayTiming::from(&app_state.settings.relay);
        let events = relay(
            app_state.backend.clone(),
            &app_state.settings.upstream,
            request,
            timing,
        );
        Ok(sse_response(events))
    } else {
        complete_once(&app_state, request).await
    }
}

async fn complete_once(app_state: &AppState, request: ChatRequest) -> Result<Response, RelayError> {
    let deployment_id = app_state
        .settings
        .upstream
        .resolve_deployment_id(request.deployment_id.as_deref())
        .ok_or_else(|| RelayError::Config("Deployment ID is required".into()))?;

    let completion = app_state
        .backend
        .complete(
            &request.message,
            &deployment_id,
            app_state.settings.relay.completion_timeout(),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": completion.text,
        "full_response": completion.raw,
    }))
    .into_response())
}
