use crate::error::RelayError;

/// Candidate variable names per setting, in priority order. The managed
/// runtime injects `MLOPS_RUNTIME_PARAM_*`; local development uses the bare names.
pub const API_TOKEN_VARS: &[&str] = &[
    "MLOPS_RUNTIME_PARAM_DATAROBOT_API_TOKEN",
    "DATAROBOT_API_TOKEN",
];
pub const ENDPOINT_VARS: &[&str] = &[
    "MLOPS_RUNTIME_PARAM_DATAROBOT_ENDPOINT",
    "DATAROBOT_ENDPOINT",
];
pub const DEPLOYMENT_ID_VARS: &[&str] = &[
    "MLOPS_RUNTIME_PARAM_DATAROBOT_DEPLOYMENT_ID",
    "DATAROBOT_DEPLOYMENT_ID",
];

const API_V2_SUFFIX: &str = "/api/v2";

/// Connection settings for the remote completion service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub api_token: String,
    pub endpoint: String,
    pub deployment_id: String,
}

/// First candidate whose value is non-empty after trimming wins.
pub fn resolve_first<F>(lookup: &F, candidates: &[&str]) -> String
where
    F: Fn(&str) -> Option<String>,
{
    candidates
        .iter()
        .filter_map(|k| lookup(*k))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

impl UpstreamConfig {
    pub fn new(
        api_token: impl Into<String>,
        endpoint: impl Into<String>,
        deployment_id: impl Into<String>,
    ) -> Self {
        Self {
            api_token: api_token.into().trim().to_string(),
            endpoint: endpoint.into().trim().to_string(),
            deployment_id: deployment_id.into().trim().to_string(),
        }
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            api_token: resolve_first(&lookup, API_TOKEN_VARS),
            endpoint: resolve_first(&lookup, ENDPOINT_VARS),
            deployment_id: resolve_first(&lookup, DEPLOYMENT_ID_VARS),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn has_api_token(&self) -> bool {
        !self.api_token.trim().is_empty()
    }

    pub fn has_endpoint(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }

    pub fn has_deployment_id(&self) -> bool {
        !self.deployment_id.trim().is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.has_api_token() && self.has_endpoint() && self.has_deployment_id()
    }

    /// Request override wins; blank overrides fall back to the configured default.
    pub fn resolve_deployment_id(&self, requested: Option<&str>) -> Option<String> {
        requested
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| Some(self.deployment_id.trim()).filter(|s| !s.is_empty()))
            .map(str::to_string)
    }

    pub fn completion_url(&self, deployment_id: &str) -> Result<String, RelayError> {
        derive_completion_url(&self.endpoint, deployment_id)
    }
}

/// `{base}/api/v2/deployments/{id}/chat/completions`, tolerating a base that
/// already ends in `/api/v2` (with or without a trailing slash).
pub fn derive_completion_url(endpoint: &str, deployment_id: &str) -> Result<String, RelayError> {
    let endpoint = endpoint.trim();
    let deployment_id = deployment_id.trim();
    if endpoint.is_empty() {
        return Err(RelayError::Config("DATAROBOT_ENDPOINT is not configured".into()));
    }
    if deployment_id.is_empty() {
        return Err(RelayError::Config("Deployment ID is required".into()));
    }

    let base = endpoint.strip_suffix('/').unwrap_or(endpoint);
    let base = base.strip_suffix(API_V2_SUFFIX).unwrap_or(base);
    Ok(format!(
        "{}/api/v2/deployments/{}/chat/completions",
        base, deployment_id
    ))
}
