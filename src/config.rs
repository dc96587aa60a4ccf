//! Configuration types.

use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use secrecy::SecretString;

use crate::error::ConfigError;
use crate::workflow::Workflow;

const DEFAULT_API_URL: &str = "http://localhost:3000/api";
const DEFAULT_WS_URL: &str = "ws://localhost:3001";

/// Backend REST configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: Url,
    /// Bearer token sent with every request, if signed in.
    pub token: Option<SecretString>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ApiConfig {
    /// Config for `base_url` with no token and the default timeout.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_url("BOTFLOW_API_URL", base_url)?,
            token: None,
            timeout: Duration::from_secs(30),
        })
    }

    /// Read from `BOTFLOW_API_URL`, `BOTFLOW_API_TOKEN` and `BOTFLOW_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url =
            std::env::var("BOTFLOW_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let token = std::env::var("BOTFLOW_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .map(SecretString::from);

        let timeout_secs: u64 = std::env::var("BOTFLOW_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            base_url: parse_url("BOTFLOW_API_URL", &base_url)?,
            token,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Bounded fixed-delay reconnection policy for the live socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts before giving up.
    pub max_attempts: u32,
    /// Wait between attempts.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(3),
        }
    }
}

/// Live chat push-connection configuration.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub url: Url,
    pub reconnect: ReconnectPolicy,
}

impl LiveConfig {
    pub fn new(url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            url: parse_url("BOTFLOW_WS_URL", url)?,
            reconnect: ReconnectPolicy::default(),
        })
    }

    /// Read from `BOTFLOW_WS_URL`, `BOTFLOW_WS_MAX_RECONNECTS` and
    /// `BOTFLOW_WS_RECONNECT_DELAY_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("BOTFLOW_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string());
        let defaults = ReconnectPolicy::default();

        let max_attempts: u32 = std::env::var("BOTFLOW_WS_MAX_RECONNECTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_attempts);

        let delay = std::env::var("BOTFLOW_WS_RECONNECT_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.delay);

        Ok(Self {
            url: parse_url("BOTFLOW_WS_URL", &url)?,
            reconnect: ReconnectPolicy {
                max_attempts,
                delay,
            },
        })
    }
}

/// Read a workflow definition from a JSON file.
pub async fn load_workflow_file(path: impl AsRef<Path>) -> Result<Workflow, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidValue {
        key: path.display().to_string(),
        message: e.to_string(),
    })
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}': {e}"),
    })
}
