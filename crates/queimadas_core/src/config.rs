//! Runtime configuration loaded from environment variables.

use crate::constants::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER_URL};
use std::env;
use std::path::PathBuf;

/// Runtime configuration for dashboard front-ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the backend API; always ends with `/`.
    pub server_url: String,
    /// Path of the dashboard configuration document, when provided.
    pub config_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
    /// Overrides `UseLayerGroupsInTheLayerExplorer` from the document when set.
    pub use_layer_groups: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            config_path: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            use_layer_groups: None,
        }
    }
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = resolve_home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn resolve_home_dir() -> Option<PathBuf> {
    for key in ["HOME", "USERPROFILE"] {
        if let Ok(value) = env::var(key) {
            if !value.trim().is_empty() {
                return Some(PathBuf::from(value));
            }
        }
    }
    None
}

/// Make sure a base URL ends with exactly one trailing slash.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    format!("{}/", trimmed)
}

/// Parse a boolean-like environment flag value.
///
/// Truthy: `1`, `true`, `yes`, `on`. Falsy: `0`, `false`, `no`, `off`, empty.
/// Matching is case-insensitive and ignores surrounding whitespace.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean flag from the environment; missing or unknown values are `false`.
pub fn env_flag_enabled(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or(false)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing
    /// or malformed.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let request_timeout_secs = match env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    tracing::warn!(
                        "Invalid REQUEST_TIMEOUT_SECS='{}'; using {}",
                        raw,
                        defaults.request_timeout_secs
                    );
                    defaults.request_timeout_secs
                }
            },
            Err(_) => defaults.request_timeout_secs,
        };

        Self {
            server_url: env::var("QUEIMADAS_SERVER")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(|value| normalize_base_url(&value))
                .unwrap_or(defaults.server_url),
            config_path: env::var("QUEIMADAS_CONFIG")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(|value| expand_tilde(value.trim())),
            request_timeout_secs,
            use_layer_groups: env::var("QUEIMADAS_USE_LAYER_GROUPS")
                .ok()
                .and_then(|value| parse_env_flag(&value)),
        }
    }
}
