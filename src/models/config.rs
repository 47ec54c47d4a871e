//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// GitHub API and org settings
    #[serde(default)]
    pub github: GithubConfig,

    /// HTTP fetch behavior settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Notification batching settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Snapshot persistence settings
    #[serde(default)]
    pub state: StateConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.github.org.trim().is_empty() {
            return Err(AppError::validation("github.org is empty"));
        }
        if self.github.user_agent.trim().is_empty() {
            return Err(AppError::validation("github.user_agent is empty"));
        }
        if self.github.per_page == 0 || self.github.per_page > 100 {
            return Err(AppError::validation("github.per_page must be in 1..=100"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.fetch.max_concurrent == 0 {
            return Err(AppError::validation("fetch.max_concurrent must be > 0"));
        }
        if self.notify.max_notifications == 0 {
            return Err(AppError::validation("notify.max_notifications must be > 0"));
        }
        if self.state.file.trim().is_empty() {
            return Err(AppError::validation("state.file is empty"));
        }
        Ok(())
    }
}

/// GitHub API and organization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// REST API base URL
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Web base URL (dependents network page lives here)
    #[serde(default = "defaults::html_base")]
    pub html_base: String,

    /// Organization whose public repositories are watched
    #[serde(default = "defaults::org")]
    pub org: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Page size for list endpoints (max 100)
    #[serde(default = "defaults::per_page")]
    pub per_page: u32,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            html_base: defaults::html_base(),
            org: defaults::org(),
            user_agent: defaults::user_agent(),
            per_page: defaults::per_page(),
        }
    }
}

/// HTTP fetch behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Retries allowed after the first attempt of each request
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Maximum concurrent collection fetches
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Delay between requests in milliseconds
    #[serde(default)]
    pub request_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            max_concurrent: defaults::max_concurrent(),
            request_delay_ms: 0,
        }
    }
}

/// Notification batching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Cap on individual notifications per run; overflow collapses into
    /// one summary message
    #[serde(default = "defaults::max_notifications")]
    pub max_notifications: usize,

    /// Stable link to the full run log, referenced by the summary message
    #[serde(default = "defaults::run_log_url")]
    pub run_log_url: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            max_notifications: defaults::max_notifications(),
            run_log_url: defaults::run_log_url(),
        }
    }
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Path of the snapshot JSON document
    #[serde(default = "defaults::state_file")]
    pub file: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            file: defaults::state_file(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (error, warn, info, debug, trace)
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// Default values for configuration fields.
mod defaults {
    pub fn api_base() -> String {
        "https://api.github.com".to_string()
    }

    pub fn html_base() -> String {
        "https://github.com".to_string()
    }

    pub fn org() -> String {
        "netresearch".to_string()
    }

    pub fn user_agent() -> String {
        format!("starwatch/{}", env!("CARGO_PKG_VERSION"))
    }

    pub fn per_page() -> u32 {
        100
    }

    pub fn timeout() -> u64 {
        30
    }

    pub fn max_retries() -> u32 {
        3
    }

    pub fn max_concurrent() -> usize {
        4
    }

    pub fn max_notifications() -> usize {
        20
    }

    pub fn run_log_url() -> String {
        "https://github.com/netresearch/star-watch/actions".to_string()
    }

    pub fn state_file() -> String {
        "state/stars-state.json".to_string()
    }

    pub fn log_level() -> String {
        "info".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [github]
            org = "my-org"

            [notify]
            max_notifications = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.github.org, "my-org");
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.notify.max_notifications, 5);
        assert_eq!(config.fetch.timeout_secs, 30);
    }

    #[test]
    fn test_validation_rejects_zero_cap() {
        let mut config = Config::default();
        config.notify.max_notifications = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_oversized_page() {
        let mut config = Config::default();
        config.github.per_page = 250;
        assert!(config.validate().is_err());
    }
}
