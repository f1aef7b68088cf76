use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the REST notification backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Base URL of the REST data source (e.g. "https://xyz.supabase.co").
    pub url: String,
    /// API key sent with every request.
    pub api_key: String,
    /// How often the live subscription polls for undisplayed rows, in
    /// milliseconds.
    pub poll_interval_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            poll_interval_ms: 3_000,
            timeout_seconds: 10,
        }
    }
}

impl BackendSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
