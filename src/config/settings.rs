use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub status: StatusSettings,

    /// Custom string status -> numeric error code, merged into the global map
    #[serde(default)]
    pub error_code_map: BTreeMap<String, u16>,
}

/// Transport used for URL requests
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Zero disables redirects
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

fn default_user_agent() -> String {
    format!("lovit/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_redirects() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusSettings {
    /// Where to read the status when a fetch does not say
    #[serde(default = "default_status_path")]
    pub path: String,
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            path: default_status_path(),
        }
    }
}

fn default_status_path() -> String {
    "status".to_string()
}
