use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Request timed out. The agent may be processing a complex request.")]
    UpstreamTimeout,

    #[error("API request failed: {message}")]
    UpstreamHttp { status: Option<u16>, message: String },

    #[error("No response from agent")]
    NoResponse,

    #[error("Unexpected error: {0}")]
    Unexpected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            RelayError::UpstreamHttp { .. } | RelayError::NoResponse => StatusCode::BAD_GATEWAY,
            RelayError::Config(_)
            | RelayError::Unexpected(_)
            | RelayError::Io(_)
            | RelayError::ConfigFile(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classifies a transport-level failure from the outbound client.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return RelayError::UpstreamTimeout;
        }
        RelayError::UpstreamHttp {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        let body = json!({
            "success": false,
            "error": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
