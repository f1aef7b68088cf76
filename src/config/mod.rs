//! Configuration module for the notification engine.
//!
//! Two layers live here. [`ToastConfig`] is the flat widget option store the
//! host page drives (typed fields, string merge with coercion, log-and-drop
//! validation). [`AppConfig`] wraps it together with backend and logging
//! settings for the standalone binary, loaded from TOML with environment
//! overrides.
//!
//! # Configuration Precedence
//!
//! 1. Host-page overrides via [`ToastConfig::merge`] (highest priority)
//! 2. Environment variables (`PROOFPOP_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)

pub mod backend;
pub mod error;
pub mod logging;
pub mod widget;

pub use backend::BackendSettings;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use widget::{Position, ToastConfig};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the engine binary.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Widget behavior options.
    pub widget: ToastConfig,
    /// REST backend connection settings.
    pub backend: BackendSettings,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supports PROOFPOP_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("PROOFPOP_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Ok(key) = std::env::var("PROOFPOP_BACKEND_KEY") {
            self.backend.api_key = key;
        }
        if let Ok(table) = std::env::var("PROOFPOP_TABLE") {
            if !table.is_empty() {
                self.widget.table_name = table;
            }
        }
        if let Ok(level) = std::env::var("PROOFPOP_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("PROOFPOP_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }
        self
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.widget.validate()?;

        if !self.backend.url.is_empty() {
            reqwest::Url::parse(&self.backend.url)
                .map_err(|e| ConfigError::invalid("backend.url", format!("invalid URL: {e}")))?;
        }
        if self.backend.poll_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "backend.poll_interval_ms",
                "must be positive",
            ));
        }

        Ok(())
    }
}
