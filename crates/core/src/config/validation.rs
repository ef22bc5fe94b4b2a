//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin_url` is not an http(s) URL
    /// - `cache_version` is 0
    /// - `static_assets` is empty or holds a path without a leading `/`
    /// - `timeout_ms` or `message_timeout_ms` is outside 100ms..=5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.origin()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "origin_url".into(),
                reason: format!("unsupported scheme: {}", origin.scheme()),
            });
        }

        if self.cache_version == 0 {
            return Err(ConfigError::Invalid { field: "cache_version".into(), reason: "must be at least 1".into() });
        }

        if self.static_assets.is_empty() {
            return Err(ConfigError::Invalid { field: "static_assets".into(), reason: "must not be empty".into() });
        }
        if let Some(asset) = self.static_assets.iter().find(|a| !a.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "static_assets".into(),
                reason: format!("path must start with '/': {asset}"),
            });
        }

        if !self.shell_document.starts_with('/') {
            return Err(ConfigError::Invalid { field: "shell_document".into(), reason: "must start with '/'".into() });
        }
        if !self.static_assets.contains(&self.shell_document) {
            tracing::warn!(
                shell_document = %self.shell_document,
                "shell document is not part of static_assets; offline fallback will miss"
            );
        }

        for (field, value) in [("timeout_ms", self.timeout_ms), ("message_timeout_ms", self.message_timeout_ms)] {
            if value < 100 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
            }
            if value > 300_000 {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}
