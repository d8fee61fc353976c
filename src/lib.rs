//! Chatwire - chat-completion client
//!
//! Talks to an OpenAI-style chat completion service in single-shot or
//! streaming mode, and to its file endpoints.
//!
//! Message `content` may be a string or an array of content items. Array
//! elements are decoded through a pluggable [`ContentItemMatcher`]; see
//! [`api::registry`] for how to register additional item shapes.

pub mod api;
pub mod client;
pub mod config;
pub mod error;

pub use api::{
    ChatChunk, ChatCompletion, ChatDefaults, ChatParams, ChatResponse, Content, ContentDecoder,
    ContentItem, ContentItemMatcher, FileInfo, FileUpload, Message, StreamFrame,
};
pub use config::{ClientConfig, ConfigLoader};
pub use error::{ChatwireError, Result};

use api::files::FileResponse;
use client::HttpClient;

const CHAT_PATH: &str = "chat/completions";
const FILES_PATH: &str = "files";

/// A chat request ready to be sent
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub url: String,

    /// Normalized JSON body
    pub body: Vec<u8>,

    pub stream: bool,
}

/// The main chat client
pub struct ChatClient {
    config: ClientConfig,
    http_client: HttpClient,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = HttpClient::new(&config)?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Create a client from config files and the environment
    pub fn from_env() -> Result<Self> {
        Self::new(ConfigLoader::new()?.into_config()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Normalize parameters and build the request for `path`
    pub fn prepare_chat(&self, path: &str, params: ChatParams) -> Result<ChatRequest> {
        let params = params.normalize(&self.config.defaults())?;
        let body = serde_json::to_vec(&params)?;
        Ok(ChatRequest {
            url: self.config.endpoint(path),
            body,
            stream: params.stream,
        })
    }

    /// Send a chat request to `/chat/completions`
    pub async fn send_chat(&self, params: ChatParams) -> Result<ChatResponse> {
        self.send_chat_to(CHAT_PATH, params).await
    }

    /// Send a chat request to a caller-chosen path
    pub async fn send_chat_to(&self, path: &str, params: ChatParams) -> Result<ChatResponse> {
        let request = self.prepare_chat(path, params)?;
        let body = self
            .http_client
            .post_json(&request.url, request.body, request.stream)
            .await?;
        Ok(ChatResponse::new(
            request.stream,
            body,
            self.config.empty_line_limit,
        ))
    }

    /// Single-shot completion; an embedded service error becomes `Err`
    pub async fn chat(&self, params: ChatParams) -> Result<ChatCompletion> {
        let mut response = self.send_chat(params.with_stream(false)).await?;
        response.get().await?.into_result()
    }

    /// Upload a file to `/files`
    pub async fn upload_file(&self, upload: FileUpload) -> Result<FileInfo> {
        self.upload_file_to(FILES_PATH, upload).await
    }

    pub async fn upload_file_to(&self, path: &str, upload: FileUpload) -> Result<FileInfo> {
        let url = self.config.endpoint(path);
        let body = self
            .http_client
            .post_multipart(&url, upload.into_form()?)
            .await?;
        decode_file_response(&body)
    }

    /// Fetch file metadata from `/files/{id}`
    pub async fn retrieve_file(&self, file_id: &str) -> Result<FileInfo> {
        self.retrieve_file_from(FILES_PATH, file_id).await
    }

    pub async fn retrieve_file_from(&self, path: &str, file_id: &str) -> Result<FileInfo> {
        if file_id.is_empty() {
            return Err(ChatwireError::MissingFileId);
        }
        let url = self
            .config
            .endpoint(&format!("{}/{}", path.trim_end_matches('/'), file_id));
        let body = self.http_client.get(&url).await?;
        decode_file_response(&body)
    }
}

fn decode_file_response(body: &[u8]) -> Result<FileInfo> {
    serde_json::from_slice::<FileResponse>(body)
        .map_err(|e| ChatwireError::decode(e, body))?
        .into_result()
}
