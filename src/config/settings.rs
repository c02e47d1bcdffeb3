use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::upstream::UpstreamConfig;
use crate::error::RelayError;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub upstream: UpstreamConfig,
}

/// The on-disk part of the settings. Secrets never live here; they come from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub server: ServerConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path prefix assigned by a reverse proxy; routes are mounted under it as well as at the root.
    pub script_name: String,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            script_name: String::new(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Normalized prefix (`/app`), or `None` when unset or `/`.
    pub fn route_prefix(&self) -> Option<String> {
        let trimmed = self.script_name.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(trimmed.to_string())
        } else {
            Some(format!("/{}", trimmed))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub heartbeat_interval_secs: u64,
    pub chunk_size: usize,
    pub chunk_delay_ms: u64,
    /// Upstream deadline for the streaming path.
    pub stream_timeout_secs: u64,
    /// Upstream deadline for the single-shot JSON path.
    pub completion_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 5,
            chunk_size: 30,
            chunk_delay_ms: 50,
            stream_timeout_secs: 300,
            completion_timeout_secs: 180,
        }
    }
}

impl RelayConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }
}

impl Settings {
    pub fn load() -> Result<Self, RelayError> {
        let file = match Self::find_config_file() {
            Some(path) => Self::parse_file(&path)?,
            None => FileSettings::default(),
        };
        Ok(Self::from_parts(file, |k| std::env::var(k).ok()))
    }

    pub fn parse_file(path: impl AsRef<Path>) -> Result<FileSettings, RelayError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Applies environment overrides on top of file settings.
    pub fn from_parts<F>(file: FileSettings, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let FileSettings {
            mut server,
            mut relay,
        } = file;

        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse::<u16>().ok()) {
            server.port = port;
        }
        if let Some(name) = lookup("SCRIPT_NAME") {
            server.script_name = name.trim().to_string();
        }
        if relay.chunk_size == 0 {
            tracing::warn!("relay.chunk_size must be positive; using 30");
            relay.chunk_size = RelayConfig::default().chunk_size;
        }

        Self {
            server,
            relay,
            upstream: UpstreamConfig::from_lookup(lookup),
        }
    }

    fn find_config_file() -> Option<String> {
        let possible_names = ["relay.toml", "config.toml"];

        possible_names
            .iter()
            .find(|name| Path::new(name).exists())
            .map(|name| name.to_string())
    }
}
