//! Renderer configuration.

use serde::{Deserialize, Serialize};

/// Settings of a [`Renderer`](crate::schedule::Renderer).
///
/// Deserializes from the host's JSON config; missing fields take their
/// defaults.
///
/// ```rust,ignore
/// let config = RendererConfig::from_json(r#"{"requests_pathname_prefix": "/app/"}"#)?;
/// assert_eq!(config.update_url(), "/app/_dash-update-component");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Prefix of every request path.
    pub requests_pathname_prefix: String,
    /// Path of the update endpoint, relative to the prefix.
    pub update_component_path: String,
    /// Status the server answers with when nothing changed.
    pub prevent_update_status: u16,
    /// Upper bound on scheduling rounds of one run.
    pub max_rounds: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            requests_pathname_prefix: "/".to_string(),
            update_component_path: "_dash-update-component".to_string(),
            prevent_update_status: 204,
            max_rounds: 10_000,
        }
    }
}

impl RendererConfig {
    /// Parse a JSON config.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Set the request path prefix.
    pub fn requests_pathname_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.requests_pathname_prefix = prefix.into();
        self
    }

    /// Set the prevent-update status.
    pub fn prevent_update_status(mut self, status: u16) -> Self {
        self.prevent_update_status = status;
        self
    }

    /// Set the round limit.
    pub fn max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// URL of the update endpoint.
    pub fn update_url(&self) -> String {
        format!("{}{}", self.requests_pathname_prefix, self.update_component_path)
    }
}
