//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PATCHNOTES_*)
//! 2. TOML config file (if PATCHNOTES_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::Generation;

mod validation;

pub use validation::ConfigError;

/// App-shell assets stored at install time.
pub const DEFAULT_STATIC_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/style/index.css",
    "/style/root.css",
    "/style/balance.css",
    "/scripts/backgroundRandom.js",
    "/scripts/populatePatches.js",
    "/scripts/themeSwitch.js",
    "/assets/images/faction/UEF.svg",
    "/assets/images/faction/Cybran.svg",
    "/assets/images/faction/Aeon.svg",
    "/assets/images/faction/Seraphim.svg",
    "/assets/data/patches.json",
    "/favicon.ico",
];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PATCHNOTES_*)
/// 2. TOML config file (if PATCHNOTES_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin serving the static site.
    ///
    /// Set via PATCHNOTES_ORIGIN_URL environment variable.
    #[serde(default = "default_origin_url")]
    pub origin_url: String,

    /// Address the worker proxy listens on.
    ///
    /// Set via PATCHNOTES_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path to the SQLite cache storage.
    ///
    /// Set via PATCHNOTES_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Cache generation installed by this worker build.
    ///
    /// Set via PATCHNOTES_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: u32,

    /// App-shell paths fetched at install time.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Path fragments whose responses go into the dynamic cache.
    #[serde(default = "default_dynamic_patterns")]
    pub dynamic_patterns: Vec<String>,

    /// Cached document served to HTML requests when the network is down.
    #[serde(default = "default_shell_document")]
    pub shell_document: String,

    /// Path of the patch manifest relative to the origin.
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,

    /// User-Agent string for outbound requests.
    ///
    /// Set via PATCHNOTES_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Outbound request timeout in milliseconds.
    ///
    /// Set via PATCHNOTES_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// How long the bridge waits for a worker reply, in milliseconds.
    ///
    /// Set via PATCHNOTES_MESSAGE_TIMEOUT_MS environment variable.
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,

    /// File holding the page's persisted UI state.
    ///
    /// Set via PATCHNOTES_STATE_PATH environment variable.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

fn default_origin_url() -> String {
    "http://127.0.0.1:8000".into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./patchnotes-cache.sqlite")
}

fn default_cache_version() -> u32 {
    1
}

fn default_static_assets() -> Vec<String> {
    DEFAULT_STATIC_ASSETS.iter().map(|s| s.to_string()).collect()
}

fn default_dynamic_patterns() -> Vec<String> {
    vec!["/pages/balance/".into(), "/assets/".into()]
}

fn default_shell_document() -> String {
    "/index.html".into()
}

fn default_manifest_path() -> String {
    "/assets/data/patches.json".into()
}

fn default_user_agent() -> String {
    "patchnotes/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_message_timeout_ms() -> u64 {
    5_000
}

fn default_state_path() -> PathBuf {
    PathBuf::from("./patchnotes-state.json")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin_url: default_origin_url(),
            listen_addr: default_listen_addr(),
            db_path: default_db_path(),
            cache_version: default_cache_version(),
            static_assets: default_static_assets(),
            dynamic_patterns: default_dynamic_patterns(),
            shell_document: default_shell_document(),
            manifest_path: default_manifest_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            message_timeout_ms: default_message_timeout_ms(),
            state_path: default_state_path(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Bridge reply timeout as Duration.
    pub fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }

    /// The generation this build installs.
    pub fn generation(&self) -> Generation {
        Generation(self.cache_version)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin_url` is not an absolute URL.
    pub fn origin(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.origin_url)
            .map_err(|e| ConfigError::Invalid { field: "origin_url".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PATCHNOTES_`
    /// 2. TOML file from `PATCHNOTES_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("PATCHNOTES_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PATCHNOTES_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
