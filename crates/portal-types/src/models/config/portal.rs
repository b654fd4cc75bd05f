//! Top-level pipeline configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ConfigError;

use super::auth::AuthConfig;
use super::enums::PortalMode;
use super::retry::RetryConfig;

/// Full pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct PortalConfig {
    /// Base URL of the search API
    #[validate(url)]
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Path of the query endpoint, relative to `api_base`
    #[serde(default = "default_graphql_path")]
    pub graphql_path: String,
    /// Deployment mode
    #[serde(default)]
    pub mode: PortalMode,
    /// Per-attempt timeout in milliseconds
    #[validate(range(min = 1_u64))]
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Backoff policy
    #[serde(default)]
    #[validate(nested)]
    pub retry: RetryConfig,
    /// Credential settings (authenticated mode only)
    #[serde(default)]
    #[validate(nested)]
    pub auth: AuthConfig,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            graphql_path: default_graphql_path(),
            mode: PortalMode::default(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            retry: RetryConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl PortalConfig {
    /// Query endpoint: `api_base` and `graphql_path` joined by exactly one `/`.
    pub fn endpoint(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        let path = self.graphql_path.trim_start_matches('/');
        if path.is_empty() {
            return base.to_string();
        }
        format!("{}/{}", base, path)
    }

    /// Validate field ranges and formats.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::invalid("config", e.to_string()))
    }
}

pub fn default_api_base() -> String {
    "http://localhost:5000/".to_string()
}

pub fn default_graphql_path() -> String {
    "graphql".to_string()
}

pub const fn default_fetch_timeout_ms() -> u64 {
    15_000
}
