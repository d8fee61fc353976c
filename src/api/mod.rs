//! API Module
//!
//! Chat completion types, message content decoding, streaming and files.

pub mod completion;
pub mod content;
pub mod files;
pub mod registry;
pub mod response;
pub mod streaming;

pub use completion::{
    ApiError, ChatChoice, ChatCompletion, ChatDefaults, ChatParams, ContentFilterResults,
    FilterSeverity, FinishReason, FunctionCall, Message, PromptAnnotation, PromptFilterResult,
    ToolCall, Usage, DEFAULT_MODEL, MAX_CHOICES,
};
pub use content::{
    Content, ContentDecoder, ContentItem, ImageContent, ImageUrl, TextContent, UnknownItemPolicy,
};
pub use files::{FileInfo, FileUpload};
pub use registry::{
    decode_item, reset_content_decoder, set_content_decoder, set_content_item_matcher,
    set_unknown_item_policy, ContentItemMatcher, DefaultMatcher, ItemDecoder,
};
pub use response::ChatResponse;
pub use streaming::{
    ByteStream, ChatChunk, DecoderState, FunctionDelta, LineReader, StreamAccumulator,
    StreamChoice, StreamDecoder, StreamDelta, StreamFrame, ToolCallDelta,
    DEFAULT_EMPTY_LINE_LIMIT,
};
