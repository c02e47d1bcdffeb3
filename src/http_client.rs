use std::time::Duration;

use reqwest::ClientBuilder;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

fn proxy_env_vars() -> Vec<&'static str> {
    [
        "HTTPS_PROXY",
        "https_proxy",
        "HTTP_PROXY",
        "http_proxy",
        "ALL_PROXY",
        "all_proxy",
    ]
    .into_iter()
    .filter(|k| std::env::var(k).is_ok_and(|v| !v.trim().is_empty()))
    .collect()
}

fn base_builder() -> ClientBuilder {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
}

/// Shared client for the completion service. The overall deadline is set per
/// request since the streaming and single-shot paths use different budgets.
pub fn upstream_client() -> Result<reqwest::Client, reqwest::Error> {
    let proxies = proxy_env_vars();
    if !proxies.is_empty() {
        tracing::info!("Outbound requests use proxy settings from {:?}", proxies);
    }
    base_builder().build()
}
