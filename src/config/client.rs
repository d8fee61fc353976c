//! Client Configuration
//!
//! Connection settings and the client-level defaults used when normalizing
//! chat parameters.

use crate::api::completion::ChatDefaults;
use crate::api::streaming::DEFAULT_EMPTY_LINE_LIMIT;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_empty_line_limit() -> usize {
    DEFAULT_EMPTY_LINE_LIMIT
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Configuration for a chat client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bearer token sent with every request
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Used when a request leaves `max_tokens` at zero
    #[serde(default)]
    pub default_max_tokens: u32,

    /// Used when a request's temperature is out of range
    #[serde(default)]
    pub default_temperature: f64,

    /// Non-data lines tolerated per stream decode call
    #[serde(default = "default_empty_line_limit")]
    pub empty_line_limit: usize,

    /// Whole-request timeout for single-shot and file requests. Streaming
    /// bodies are read without a deadline.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            default_max_tokens: 0,
            default_temperature: 0.0,
            empty_line_limit: default_empty_line_limit(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// An empty base URL falls back to the public endpoint
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            api_key: api_key.into(),
            base_url: if base_url.is_empty() {
                default_base_url()
            } else {
                base_url
            },
            ..Default::default()
        }
    }

    /// Set client-level defaults; non-positive values leave the current ones
    pub fn with_defaults(mut self, max_tokens: u32, temperature: f64) -> Self {
        if max_tokens > 0 {
            self.default_max_tokens = max_tokens;
        }
        if temperature > 0.0 {
            self.default_temperature = temperature;
        }
        self
    }

    pub fn with_empty_line_limit(mut self, limit: usize) -> Self {
        self.empty_line_limit = limit;
        self
    }

    pub fn defaults(&self) -> ChatDefaults {
        ChatDefaults {
            max_tokens: self.default_max_tokens,
            temperature: self.default_temperature,
        }
    }

    /// Join `path` onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
