//! Router configuration.

use serde::Deserialize;

/// Router configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Log every dispatched request at trace level.
    pub trace_requests: bool,
    /// Log the error of a failure walk that no failure handler took.
    pub log_unhandled_failures: bool,
    /// Value of the `Server` header on default 404/500 responses; `None` omits it.
    pub server_name: Option<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            trace_requests: false,
            log_unhandled_failures: true,
            server_name: Some("microweb-rs".to_string()),
        }
    }
}

impl RouterConfig {
    /// Read a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
