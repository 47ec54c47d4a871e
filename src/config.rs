// src/config.rs

//! Configuration and credential loading utilities.
//!
//! File-based configuration lives in [`crate::models::Config`]; secrets are
//! only ever read from the environment.

use std::env;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Environment variable holding the GitHub API token.
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Environment variable holding the Matrix webhook URL.
pub const MATRIX_WEBHOOK_VAR: &str = "MATRIX_WEBHOOK_URL";

/// Secrets loaded from the process environment.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// GitHub API bearer token
    pub github_token: String,

    /// Matrix webhook URL; absent means notifications cannot be delivered
    /// (dry runs are still possible)
    pub webhook_url: Option<String>,
}

impl Credentials {
    /// Load credentials from the environment.
    ///
    /// The GitHub token is required for every run; the webhook URL is only
    /// required when notifications are actually delivered.
    pub fn from_env() -> Result<Self> {
        let github_token = env::var(GITHUB_TOKEN_VAR)
            .map_err(|_| AppError::config(format!("{GITHUB_TOKEN_VAR} is not set")))?;
        if github_token.trim().is_empty() {
            return Err(AppError::config(format!("{GITHUB_TOKEN_VAR} is empty")));
        }

        let webhook_url = env::var(MATRIX_WEBHOOK_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Self {
            github_token,
            webhook_url,
        })
    }

    /// Webhook URL, or an error when delivery was requested without one.
    pub fn require_webhook(&self) -> Result<&str> {
        self.webhook_url
            .as_deref()
            .ok_or_else(|| AppError::config(format!("{MATRIX_WEBHOOK_VAR} is not set")))
    }
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if loading fails.
pub fn load_config(path: &Path) -> Config {
    Config::load_or_default(path)
}
