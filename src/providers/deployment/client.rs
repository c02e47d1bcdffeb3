use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::error::RelayError;

use super::types::{Completion, CompletionRequest, extract_text};

const ERROR_BODY_PREVIEW_CHARS: usize = 500;

/// Something that can turn one user message into one assistant reply.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        message: &str,
        deployment_id: &str,
        timeout: Duration,
    ) -> Result<Completion, RelayError>;
}

/// Client for a hosted deployment's `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct DeploymentClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl DeploymentClient {
    pub fn new(config: UpstreamConfig, http: reqwest::Client) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl CompletionBackend for DeploymentClient {
    async fn complete(
        &self,
        message: &str,
        deployment_id: &str,
        timeout: Duration,
    ) -> Result<Completion, RelayError> {
        let url = self.config.completion_url(deployment_id)?;
        tracing::info!("Sending completion request to {} (timeout {:?})", url, timeout);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_token))
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .json(&CompletionRequest::user(message))
            .send()
            .await
            .map_err(RelayError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
            tracing::error!("Upstream returned {}: {}", status, preview);
            return Err(RelayError::UpstreamHttp {
                status: Some(status.as_u16()),
                message: format!("HTTP {} for url {}: {}", status, url, preview),
            });
        }

        let raw: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                RelayError::UpstreamTimeout
            } else {
                RelayError::UpstreamHttp {
                    status: Some(status.as_u16()),
                    message: format!("invalid JSON in response body: {}", e),
                }
            }
        })?;

        let text = extract_text(&raw)?;
        tracing::info!("Received response with {} characters", text.chars().count());
        Ok(Completion { text, raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::Path,
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::post,
    };
    use serde_json::json;

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base: &str) -> DeploymentClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let config = UpstreamConfig::new("secret", format!("{base}/api/v2/"), "dep-default");
        DeploymentClient::new(config, http)
    }

    const ROUTE: &str = "/api/v2/deployments/{id}/chat/completions";

    #[tokio::test]
    async fn posts_message_with_bearer_and_extracts_text() {
        async fn handler(
            Path(id): Path<String>,
            headers: HeaderMap,
            Json(body): Json<Value>,
        ) -> impl IntoResponse {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            Json(json!({
                "choices": [{ "message": {
                    "role": "assistant",
                    "content": format!("{id}|{auth}|{}", body["messages"][0]["content"].as_str().unwrap_or("")),
                }}]
            }))
        }
        let base = spawn_upstream(Router::new().route(ROUTE, post(handler))).await;

        let completion = client_for(&base)
            .complete("Hello", "dep-9", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(completion.text, "dep-9|Bearer secret|Hello");
        assert!(completion.raw["choices"].is_array());
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_http_error() {
        async fn handler() -> impl IntoResponse {
            (StatusCode::INTERNAL_SERVER_ERROR, "model exploded")
        }
        let base = spawn_upstream(Router::new().route(ROUTE, post(handler))).await;

        let err = client_for(&base)
            .complete("Hello", "dep", Duration::from_secs(5))
            .await
            .unwrap_err();
        match &err {
            RelayError::UpstreamHttp { status, message } => {
                assert_eq!(*status, Some(500));
                assert!(message.contains("model exploded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with("API request failed"));
    }

    #[tokio::test]
    async fn non_json_body_is_upstream_http_error() {
        async fn handler() -> impl IntoResponse {
            "<html>gateway</html>"
        }
        let base = spawn_upstream(Router::new().route(ROUTE, post(handler))).await;

        let err = client_for(&base)
            .complete("Hello", "dep", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::UpstreamHttp { status: Some(200), .. }));
    }

    #[tokio::test]
    async fn empty_choices_is_no_response() {
        async fn handler() -> impl IntoResponse {
            Json(json!({ "choices": [] }))
        }
        let base = spawn_upstream(Router::new().route(ROUTE, post(handler))).await;

        let err = client_for(&base)
            .complete("Hello", "dep", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::NoResponse));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        async fn handler() -> impl IntoResponse {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "choices": [] }))
        }
        let base = spawn_upstream(Router::new().route(ROUTE, post(handler))).await;

        let err = client_for(&base)
            .complete("Hello", "dep", Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::UpstreamTimeout));
    }

    #[tokio::test]
    async fn missing_endpoint_fails_before_sending() {
        let client = DeploymentClient::new(
            UpstreamConfig::new("t", "", "dep"),
            reqwest::Client::new(),
        );
        let err = client
            .complete("Hello", "dep", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }
}
