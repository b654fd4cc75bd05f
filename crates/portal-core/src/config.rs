//! Configuration loading.
//!
//! Order of precedence: environment overrides > JSON file > defaults.

use portal_types::{ConfigError, PortalConfig, PortalMode};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "portal.json";

pub const ENV_API: &str = "PORTAL_API";
pub const ENV_AUTH_MODE: &str = "PORTAL_AUTH_MODE";
pub const ENV_AUTH_TOKEN: &str = "PORTAL_AUTH_TOKEN";
pub const ENV_FETCH_TIMEOUT_MS: &str = "PORTAL_FETCH_TIMEOUT_MS";

/// `<config dir>/portal/portal.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("portal").join(CONFIG_FILE))
}

/// Load configuration.
///
/// An explicit `path` must exist. Without one, the default path is used
/// when present and built-in defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<PortalConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => match default_config_path() {
            Some(default_path) if default_path.exists() => read_config(&default_path)?,
            _ => PortalConfig::default(),
        },
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.check()?;
    Ok(config)
}

pub fn read_config(path: &Path) -> Result<PortalConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::from_io_error(path, &e))?;
    serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))
}

/// Apply `PORTAL_*` overrides read through `lookup`.
pub fn apply_overrides<F>(config: &mut PortalConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(api) = value(ENV_API) {
        tracing::info!("Using API base from {}", ENV_API);
        config.api_base = api;
    }
    if let Some(raw) = value(ENV_AUTH_MODE) {
        config.mode = PortalMode::from_string(&raw)
            .ok_or_else(|| ConfigError::invalid(ENV_AUTH_MODE, format!("unknown mode '{}'", raw)))?;
    }
    if let Some(token) = value(ENV_AUTH_TOKEN) {
        config.auth.token = Some(token);
    }
    if let Some(raw) = value(ENV_FETCH_TIMEOUT_MS) {
        config.fetch_timeout_ms = raw.parse().map_err(|_| {
            ConfigError::invalid(ENV_FETCH_TIMEOUT_MS, format!("not a number: '{}'", raw))
        })?;
    }
    Ok(())
}
