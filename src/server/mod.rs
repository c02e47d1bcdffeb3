pub mod handlers;
pub mod streaming;

#[cfg(test)]
pub(crate) mod test_support;

use crate::config::Settings;
use crate::error::{RelayError, Result as AppResult};
use crate::http_client::upstream_client;
use crate::providers::{CompletionBackend, DeploymentClient};
use axum::Router;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub backend: Arc<dyn CompletionBackend>,
}

pub fn create_app(settings: Settings) -> AppResult<Router> {
    let http = upstream_client()
        .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {}", e)))?;
    let backend = DeploymentClient::new(settings.upstream.clone(), http);

    if !settings.upstream.is_valid() {
        tracing::warn!(
            "Upstream configuration incomplete (token: {}, endpoint: {}, deployment: {}); chat requests may fail",
            settings.upstream.has_api_token(),
            settings.upstream.has_endpoint(),
            settings.upstream.has_deployment_id()
        );
    }

    Ok(build_router(AppState {
        settings: Arc::new(settings),
        backend: Arc::new(backend),
    }))
}

pub fn build_router(app_state: AppState) -> Router {
    let routes = handlers::routes();
    let mut app = Router::new().merge(routes.clone());
    if let Some(prefix) = app_state.settings.server.route_prefix() {
        tracing::info!("Mounting routes under {}", prefix);
        app = app.nest(&prefix, routes);
    }

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(AnyOrigin);

    app.fallback(handlers::not_found)
        .with_state(Arc::new(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("500 error: handler panicked: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}
