//! Chatwire Error Types
//!
//! Error handling for the chat client, split into transport, protocol,
//! decode and validation failures.

use crate::api::ApiError;
use thiserror::Error;

/// Main error type for chatwire operations
#[derive(Debug, Error)]
pub enum ChatwireError {
    /// Configuration errors (invalid JSON, missing key, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP request failed before a response arrived
    #[error("Request failed: {0}")]
    Request(String),

    /// Timeout reported by the transport
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Non-success HTTP status without a structured error body
    #[error("Request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    /// Structured error returned by the service
    #[error("{0}")]
    Api(ApiError),

    /// Reading from the response byte stream failed
    #[error("Streaming error: {0}")]
    Stream(String),

    /// The service sent an error frame in the middle of a stream
    #[error("Stream error frame: {raw}")]
    ErrorFrame {
        raw: String,
        error: Option<ApiError>,
    },

    /// Too many consecutive keep-alive or non-data lines
    #[error("Empty line count exceeded limit of {limit}")]
    TooManyEmptyLines { limit: usize },

    /// The stream was closed or failed earlier
    #[error("Stream is closed")]
    StreamClosed,

    /// JSON shape mismatch; `raw` holds the offending input
    #[error("Decode error: {message}. Data: {raw}")]
    Decode { message: String, raw: String },

    /// Content item with a discriminator no matcher recognizes
    #[error("Unknown content item type '{0}'")]
    UnknownContentItem(String),

    /// Message content that is neither a string nor an array
    #[error("Invalid message content: {0}")]
    InvalidContent(String),

    /// Chat request without messages
    #[error("Chat request has no messages")]
    EmptyMessages,

    /// File lookup without an id
    #[error("File id is empty")]
    MissingFileId,

    /// `recv` called on a single-shot response
    #[error("Response is not a stream, use get instead")]
    NotStreaming,

    /// `get` called on a streaming response
    #[error("Response is a stream, use recv instead")]
    NotSingleShot,
}

impl ChatwireError {
    /// Build a decode error from a serde failure and the raw input
    pub fn decode(err: impl std::fmt::Display, raw: impl AsRef<[u8]>) -> Self {
        let raw = String::from_utf8_lossy(raw.as_ref());
        ChatwireError::Decode {
            message: err.to_string(),
            raw: raw.chars().take(500).collect(),
        }
    }

    /// Whether the error was raised before any network call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ChatwireError::EmptyMessages
                | ChatwireError::MissingFileId
                | ChatwireError::NotStreaming
                | ChatwireError::NotSingleShot
        )
    }

    /// Whether the error is a streaming protocol violation
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            ChatwireError::ErrorFrame { .. }
                | ChatwireError::TooManyEmptyLines { .. }
                | ChatwireError::StreamClosed
        )
    }
}

impl From<reqwest::Error> for ChatwireError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ChatwireError::Timeout(err.to_string())
        } else if err.is_connect() {
            ChatwireError::Request(format!("Connection failed: {}", err))
        } else if err.is_decode() || err.is_body() {
            ChatwireError::Stream(format!("Failed to read response body: {}", err))
        } else {
            ChatwireError::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChatwireError {
    fn from(err: serde_json::Error) -> Self {
        ChatwireError::Decode {
            message: format!("JSON parsing error: {}", err),
            raw: String::new(),
        }
    }
}

/// Result type alias for chatwire operations
pub type Result<T> = std::result::Result<T, ChatwireError>;
