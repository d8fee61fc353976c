//! Streaming Support
//!
//! Decodes the line-oriented event stream of a streaming chat completion.
//! Each frame is one line: `data: {...}` carries a chunk, `data: {"error":`
//! is a service-side failure, and `data: [DONE]` ends the stream. Anything
//! else is keep-alive noise, tolerated up to a configured limit.

use crate::api::completion::{
    ApiError, ErrorEnvelope, FinishReason, FunctionCall, Message, PromptAnnotation,
    PromptFilterResult, ToolCall, Usage,
};
use crate::api::content::Content;
use crate::error::{ChatwireError, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::pin::Pin;

/// Raw response body as delivered by the transport
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Default number of non-data lines tolerated per decode call
pub const DEFAULT_EMPTY_LINE_LIMIT: usize = 300;

const DATA_PREFIX: &[u8] = b"data:";
const ERROR_PREFIX: &[u8] = br#"data: {"error":"#;
const DONE_SENTINEL: &[u8] = b"[DONE]";

/// A streaming chunk from the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatChunk {
    pub id: String,
    pub object: String,

    /// Creation timestamp (unix seconds)
    pub created: i64,

    pub model: String,

    /// Choices with deltas
    pub choices: Vec<StreamChoice>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub system_fingerprint: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prompt_annotations: Vec<PromptAnnotation>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prompt_filter_results: Vec<PromptFilterResult>,

    /// Usage info (only in final chunk for some providers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

/// A choice in a streaming chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: u32,

    /// The delta (partial message)
    #[serde(default)]
    pub delta: StreamDelta,

    /// Finish reason (set in final chunk)
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Delta content in a streaming chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamDelta {
    /// Role (usually only in first chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Delta for tool calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Index in the tool_calls array
    #[serde(default)]
    pub index: u32,

    /// Tool call ID (only in first chunk for this tool call)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Type (only in first chunk)
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub call_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionDelta>,
}

/// Delta for function calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// Result of one decode call
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// A chunk; more are expected
    Chunk(ChatChunk),

    /// End of stream, with the chunk carried by a truncated final frame
    End(Option<ChatChunk>),
}

impl StreamFrame {
    pub fn is_end(&self) -> bool {
        matches!(self, StreamFrame::End(_))
    }

    pub fn chunk(&self) -> Option<&ChatChunk> {
        match self {
            StreamFrame::Chunk(chunk) => Some(chunk),
            StreamFrame::End(chunk) => chunk.as_ref(),
        }
    }

    pub fn into_chunk(self) -> Option<ChatChunk> {
        match self {
            StreamFrame::Chunk(chunk) => Some(chunk),
            StreamFrame::End(chunk) => chunk,
        }
    }
}

/// Splits a byte stream into lines
pub struct LineReader {
    stream: ByteStream,
    buf: Vec<u8>,
    /// Bytes of `buf` already searched for a terminator
    scanned: usize,
    eof: bool,
}

impl LineReader {
    pub fn new(stream: ByteStream) -> Self {
        Self {
            stream,
            buf: Vec::new(),
            scanned: 0,
            eof: false,
        }
    }

    /// Read up to and including the next `\n`. At end of stream the
    /// remaining bytes (possibly none) are returned with `true`.
    pub async fn read_line(&mut self) -> Result<(Vec<u8>, bool)> {
        loop {
            if let Some(pos) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
                let end = self.scanned + pos + 1;
                let line: Vec<u8> = self.buf.drain(..end).collect();
                self.scanned = 0;
                return Ok((line, false));
            }
            self.scanned = self.buf.len();

            if self.eof {
                self.scanned = 0;
                return Ok((std::mem::take(&mut self.buf), true));
            }

            match self.stream.next().await {
                Some(Ok(bytes)) => self.buf.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    return Err(ChatwireError::Stream(format!("read line failed: {}", e)))
                }
                None => self.eof = true,
            }
        }
    }
}

/// Decoder lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Reading,
    Done,
    Error,
}

/// Turns a byte stream into [`StreamFrame`]s, one per call
pub struct StreamDecoder {
    reader: Option<LineReader>,
    empty_lines: usize,
    empty_line_limit: usize,
    state: DecoderState,
}

impl StreamDecoder {
    pub fn new(stream: ByteStream, empty_line_limit: usize) -> Self {
        Self {
            reader: Some(LineReader::new(stream)),
            empty_lines: 0,
            empty_line_limit,
            state: DecoderState::Reading,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Release the underlying byte stream
    pub fn close(&mut self) {
        self.reader = None;
    }

    /// Decode the next frame.
    ///
    /// Once the terminator was seen every call returns `End(None)`; after a
    /// failure every call returns [`ChatwireError::StreamClosed`].
    pub async fn next_frame(&mut self) -> Result<StreamFrame> {
        match self.state {
            DecoderState::Done => return Ok(StreamFrame::End(None)),
            DecoderState::Error => return Err(ChatwireError::StreamClosed),
            DecoderState::Reading => {}
        }

        let result = self.read_frame().await;
        match &result {
            Ok(StreamFrame::End(_)) => self.state = DecoderState::Done,
            Ok(StreamFrame::Chunk(_)) => {}
            Err(_) => {
                self.state = DecoderState::Error;
                self.reader = None;
            }
        }
        result
    }

    async fn read_frame(&mut self) -> Result<StreamFrame> {
        let reader = self.reader.as_mut().ok_or(ChatwireError::StreamClosed)?;
        self.empty_lines = 0;

        loop {
            let (raw, eof) = reader.read_line().await?;
            let line = raw.trim_ascii();

            if line.starts_with(ERROR_PREFIX) {
                let raw = String::from_utf8_lossy(line).into_owned();
                let error = serde_json::from_slice::<ErrorEnvelope>(&line[DATA_PREFIX.len()..])
                    .ok()
                    .map(|envelope| envelope.error);
                tracing::warn!(frame = %raw, "service sent an error frame");
                return Err(ChatwireError::ErrorFrame { raw, error });
            }

            if !line.starts_with(DATA_PREFIX) && !eof {
                self.empty_lines += 1;
                if self.empty_lines > self.empty_line_limit {
                    return Err(ChatwireError::TooManyEmptyLines {
                        limit: self.empty_line_limit,
                    });
                }
                tracing::trace!(count = self.empty_lines, "ignoring non-data line");
                continue;
            }

            let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line).trim_ascii();
            if payload == DONE_SENTINEL {
                return Ok(StreamFrame::End(None));
            }

            // a final frame cut short by the connection closing is not fatal
            return match serde_json::from_slice::<ChatChunk>(payload) {
                Ok(chunk) if eof => Ok(StreamFrame::End(Some(chunk))),
                Ok(chunk) => Ok(StreamFrame::Chunk(chunk)),
                Err(e) if eof => {
                    tracing::debug!(error = %e, "discarding truncated final frame");
                    Ok(StreamFrame::End(None))
                }
                Err(e) => Err(ChatwireError::decode(e, payload)),
            };
        }
    }
}

/// Accumulator for streaming chunks
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    /// Accumulated content
    pub content: String,

    /// Accumulated refusal text
    pub refusal: String,

    /// Accumulated tool calls, keyed by the index the service assigned
    pub tool_calls: BTreeMap<u32, ToolCallAccumulator>,

    /// Role from first chunk
    pub role: Option<String>,

    /// Finish reason from last chunk
    pub finish_reason: Option<FinishReason>,

    pub id: Option<String>,
    pub model: Option<String>,
    pub created: Option<i64>,

    /// Usage from final chunk
    pub usage: Option<Usage>,
}

/// Accumulator for a single tool call
#[derive(Debug, Default, Clone)]
pub struct ToolCallAccumulator {
    pub id: String,
    pub call_type: String,
    pub name: String,
    pub arguments: String,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a chunk into the accumulated message. Only choice 0 is kept.
    pub fn process_chunk(&mut self, chunk: &ChatChunk) {
        if self.id.is_none() && !chunk.id.is_empty() {
            self.id = Some(chunk.id.clone());
            self.model = Some(chunk.model.clone());
            self.created = Some(chunk.created);
        }

        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }

        for choice in chunk.choices.iter().filter(|c| c.index == 0) {
            if let Some(role) = &choice.delta.role {
                if self.role.is_none() {
                    self.role = Some(role.clone());
                }
            }

            if let Some(content) = &choice.delta.content {
                self.content.push_str(content);
            }

            if let Some(refusal) = &choice.delta.refusal {
                self.refusal.push_str(refusal);
            }

            if let Some(tool_calls) = &choice.delta.tool_calls {
                for tc_delta in tool_calls {
                    let tc = self.tool_calls.entry(tc_delta.index).or_default();

                    if let Some(id) = &tc_delta.id {
                        tc.id = id.clone();
                    }
                    if let Some(call_type) = &tc_delta.call_type {
                        tc.call_type = call_type.clone();
                    }

                    if let Some(func) = &tc_delta.function {
                        if let Some(name) = &func.name {
                            tc.name.push_str(name);
                        }
                        if let Some(args) = &func.arguments {
                            tc.arguments.push_str(args);
                        }
                    }
                }
            }

            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(reason);
            }
        }
    }

    /// Convert to a final Message
    pub fn into_message(self) -> Message {
        let tool_calls = if self.tool_calls.is_empty() {
            None
        } else {
            Some(
                self.tool_calls
                    .into_values()
                    .map(|tc| ToolCall {
                        index: None,
                        id: tc.id,
                        call_type: tc.call_type,
                        function: FunctionCall {
                            name: tc.name,
                            arguments: tc.arguments,
                        },
                    })
                    .collect(),
            )
        };

        Message {
            role: self.role.unwrap_or_else(|| "assistant".to_string()),
            content: Content::Text(self.content),
            refusal: (!self.refusal.is_empty()).then_some(self.refusal),
            tool_calls,
            ..Default::default()
        }
    }
}
