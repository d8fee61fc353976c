//! Chat Completion API
//!
//! Request parameters, their normalization policy, and the single-shot
//! response envelope.

use crate::api::content::Content;
use crate::error::{ChatwireError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Model used when the caller leaves it empty
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-0301";

/// Upper bound on the number of choices per request
pub const MAX_CHOICES: i32 = 5;

const PENALTY_RANGE: std::ops::RangeInclusive<f64> = -2.0..=2.0;
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=2.0;
const DEFAULT_FREQUENCY_PENALTY: f64 = 0.0;
const DEFAULT_PRESENCE_PENALTY: f64 = 0.6;

/// A message in a chat conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", "assistant", or "tool"
    #[serde(default)]
    pub role: String,

    /// Message content (string or array of content items)
    #[serde(default)]
    pub content: Content,

    /// Optional name for the message author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Refusal message generated by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,

    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Tool call ID (for tool role messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<Content>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn system(content: impl Into<Content>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<Content>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<Content>) -> Self {
        Self::new("assistant", content)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A tool call made by the assistant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Position in the tool_calls array (present in streamed fragments)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,

    /// Unique ID for this tool call
    #[serde(default)]
    pub id: String,

    /// Type of tool call (usually "function")
    #[serde(rename = "type", default)]
    pub call_type: String,

    /// Function details
    #[serde(default)]
    pub function: FunctionCall,
}

/// Function call details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function
    #[serde(default)]
    pub name: String,

    /// Arguments as JSON string
    #[serde(default)]
    pub arguments: String,
}

/// Client-level fallbacks applied during normalization
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChatDefaults {
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Chat completion request parameters
///
/// Numeric knobs use zero for "unset"; [`ChatParams::normalize`] fills them in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatParams {
    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub messages: Vec<Message>,

    #[serde(default)]
    pub temperature: f64,

    #[serde(default)]
    pub top_p: f64,

    /// Number of choices to generate
    #[serde(default)]
    pub n: i32,

    #[serde(default)]
    pub stream: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_tokens: u32,

    #[serde(default)]
    pub presence_penalty: f64,

    #[serde(default)]
    pub frequency_penalty: f64,

    /// End-user identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Additional parameters (provider-specific)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl ChatParams {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_n(mut self, n: i32) -> Self {
        self.n = n;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_penalties(mut self, frequency: f64, presence: f64) -> Self {
        self.frequency_penalty = frequency;
        self.presence_penalty = presence;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Apply the default/clamp policy. Rules run in order and later ones
    /// override earlier ones.
    pub fn normalize(mut self, defaults: &ChatDefaults) -> Result<Self> {
        if self.model.is_empty() {
            self.model = DEFAULT_MODEL.to_string();
        }
        self.n = self.n.clamp(1, MAX_CHOICES);
        if self.messages.is_empty() {
            return Err(ChatwireError::EmptyMessages);
        }
        if self.max_tokens == 0 {
            self.max_tokens = defaults.max_tokens;
        }
        if !TEMPERATURE_RANGE.contains(&self.temperature) {
            self.temperature = defaults.temperature;
        }
        if !self.top_p.is_finite() {
            self.top_p = 0.0;
        }
        // top_p wins over temperature
        if self.top_p > 0.0 {
            self.temperature = 0.0;
            if self.top_p > 1.0 {
                self.top_p = 1.0;
            }
        }
        // the service needs one sampling knob active
        if self.temperature == 0.0 && self.top_p == 0.0 {
            self.top_p = 1.0;
        }
        if !PENALTY_RANGE.contains(&self.frequency_penalty) {
            self.frequency_penalty = DEFAULT_FREQUENCY_PENALTY;
        }
        if !PENALTY_RANGE.contains(&self.presence_penalty) {
            self.presence_penalty = DEFAULT_PRESENCE_PENALTY;
        }
        Ok(self)
    }

    /// Normalize and encode as the JSON request body
    pub fn to_body(&self, defaults: &ChatDefaults) -> Result<Vec<u8>> {
        let normalized = self.clone().normalize(defaults)?;
        Ok(serde_json::to_vec(&normalized)?)
    }
}

/// Why the model stopped generating tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    FunctionCall,
    ContentFilter,
    Null,
    #[serde(other)]
    Unknown,
}

/// Structured error returned by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<serde_json::Value>,

    #[serde(rename = "type", default)]
    pub error_type: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub param: Option<serde_json::Value>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match &self.code {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let param = self
            .param
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "null".to_string());
        write!(
            f,
            "Error[{}]: {}(type:{}, param:{})",
            code, self.message, self.error_type, param
        )
    }
}

impl std::error::Error for ApiError {}

/// `{"error": {...}}` body sent with failures
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ApiError,
}

/// Severity flags for one content filter category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSeverity {
    #[serde(default)]
    pub filtered: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentFilterResults {
    #[serde(default)]
    pub hate: FilterSeverity,
    #[serde(default)]
    pub self_harm: FilterSeverity,
    #[serde(default)]
    pub sexual: FilterSeverity,
    #[serde(default)]
    pub violence: FilterSeverity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptAnnotation {
    #[serde(default)]
    pub prompt_index: u32,
    #[serde(default)]
    pub content_filter_results: ContentFilterResults,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptFilterResult {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub content_filter_results: ContentFilterResults,
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// A choice in the completion response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,

    #[serde(default)]
    pub message: Message,

    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Chat completion response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,

    /// Creation timestamp (unix seconds)
    pub created: i64,

    pub model: String,
    pub choices: Vec<ChatChoice>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub system_fingerprint: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prompt_annotations: Vec<PromptAnnotation>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prompt_filter_results: Vec<PromptFilterResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl ChatCompletion {
    /// Get the first message content
    pub fn content(&self) -> Option<String> {
        self.choices
            .first()
            .map(|c| c.message.content.to_string_content())
    }

    /// Get tool calls from the first choice
    pub fn tool_calls(&self) -> Option<&Vec<ToolCall>> {
        self.choices
            .first()
            .and_then(|c| c.message.tool_calls.as_ref())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created, 0)
    }

    /// Turn an embedded service error into `Err`
    pub fn into_result(self) -> Result<Self> {
        match self.error {
            Some(error) => Err(ChatwireError::Api(error)),
            None => Ok(self),
        }
    }
}
