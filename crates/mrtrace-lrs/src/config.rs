//! Connection settings for the LRS.

use serde::Deserialize;

/// Where and how to reach the LRS.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LrsConfig {
    /// Base URL of the xAPI endpoint; `/statements` is appended.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// HTTP basic auth user.
    #[serde(default)]
    pub username: String,

    /// HTTP basic auth password.
    #[serde(default)]
    pub password: String,

    /// Value of the `X-Experience-API-Version` header.
    #[serde(default = "default_version")]
    pub version: String,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://localhost:8080/xAPI".to_string()
}

fn default_version() -> String {
    "1.0.3".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for LrsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            username: String::new(),
            password: String::new(),
            version: default_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LrsConfig {
    /// URL of the statements resource.
    pub fn statements_url(&self) -> String {
        format!("{}/statements", self.endpoint.trim_end_matches('/'))
    }
}
