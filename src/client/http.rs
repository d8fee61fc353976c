//! HTTP Client
//!
//! Thin reqwest wrapper: bearer auth, JSON and multipart bodies, and
//! conversion of failed statuses into errors. No retries.

use crate::api::completion::ErrorEnvelope;
use crate::api::streaming::ByteStream;
use crate::config::ClientConfig;
use crate::error::{ChatwireError, Result};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

/// HTTP transport for the chat and file endpoints
pub struct HttpClient {
    client: Client,
    api_key: String,

    /// Whole-request timeout; streaming requests only get the connect timeout
    timeout: Duration,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ChatwireError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| ChatwireError::Config(format!("Invalid API key format: {}", e)))?,
        );
        Ok(headers)
    }

    /// POST a JSON body and hand back the response body as a byte stream
    pub async fn post_json(&self, url: &str, body: Vec<u8>, stream: bool) -> Result<ByteStream> {
        let mut headers = self.auth_headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if stream {
            headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        }

        tracing::debug!(url, stream, "sending chat request");
        let mut request = self.client.post(url).headers(headers).body(body);
        if !stream {
            request = request.timeout(self.timeout);
        }
        let response = self.send(request).await?;

        let byte_stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ChatwireError::from));
        Ok(Box::pin(byte_stream))
    }

    /// POST a multipart form and read the whole response body
    pub async fn post_multipart(&self, url: &str, form: Form) -> Result<Vec<u8>> {
        let headers = self.auth_headers()?;
        let request = self
            .client
            .post(url)
            .headers(headers)
            .multipart(form)
            .timeout(self.timeout);
        let response = self.send(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// GET and read the whole response body
    pub async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let headers = self.auth_headers()?;
        let request = self.client.get(url).headers(headers).timeout(self.timeout);
        let response = self.send(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Send and turn a non-success status into an error
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "request failed");
        Err(status_error(status.as_u16(), body))
    }
}

/// Prefer the structured `{"error": ...}` body when the service sent one
fn status_error(status: u16, body: String) -> ChatwireError {
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => ChatwireError::Api(envelope.error),
        Err(_) => ChatwireError::Http { status, body },
    }
}
