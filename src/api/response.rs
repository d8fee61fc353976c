//! Response Facade
//!
//! A chat response is either single-shot or streaming, fixed by the request's
//! `stream` flag. The two retrieval modes are mutually exclusive.

use crate::api::completion::{ChatCompletion, Message};
use crate::api::streaming::{
    ByteStream, ChatChunk, StreamAccumulator, StreamDecoder, StreamFrame,
};
use crate::error::{ChatwireError, Result};
use futures::{Stream, StreamExt};

enum Body {
    Single(Option<ByteStream>),
    Streaming(StreamDecoder),
}

/// Response to a chat request
pub struct ChatResponse {
    body: Body,
}

impl ChatResponse {
    pub fn new(is_stream: bool, stream: ByteStream, empty_line_limit: usize) -> Self {
        let body = if is_stream {
            Body::Streaming(StreamDecoder::new(stream, empty_line_limit))
        } else {
            Body::Single(Some(stream))
        };
        Self { body }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.body, Body::Streaming(_))
    }

    /// Read the whole body as one completion. The byte stream is released
    /// whether decoding succeeds or not.
    pub async fn get(&mut self) -> Result<ChatCompletion> {
        let stream = match &mut self.body {
            Body::Streaming(_) => return Err(ChatwireError::NotSingleShot),
            Body::Single(stream) => stream.take().ok_or(ChatwireError::StreamClosed)?,
        };

        let bytes = read_to_end(stream).await?;
        serde_json::from_slice(&bytes).map_err(|e| ChatwireError::decode(e, &bytes))
    }

    /// Decode the next streamed frame. The stream stays open after
    /// `End`; call [`ChatResponse::close`] when done.
    pub async fn recv(&mut self) -> Result<StreamFrame> {
        match &mut self.body {
            Body::Single(_) => Err(ChatwireError::NotStreaming),
            Body::Streaming(decoder) => decoder.next_frame().await,
        }
    }

    /// Release the underlying byte stream. Safe to call repeatedly.
    pub fn close(&mut self) {
        match &mut self.body {
            Body::Single(stream) => {
                stream.take();
            }
            Body::Streaming(decoder) => decoder.close(),
        }
    }

    /// Adapt a streaming response into a stream of chunks
    pub fn into_stream(mut self) -> impl Stream<Item = Result<ChatChunk>> + Send {
        async_stream::try_stream! {
            loop {
                match self.recv().await? {
                    StreamFrame::Chunk(chunk) => yield chunk,
                    StreamFrame::End(last) => {
                        if let Some(chunk) = last {
                            yield chunk;
                        }
                        break;
                    }
                }
            }
            self.close();
        }
    }

    /// Drive the stream to its end and fold the deltas of choice 0
    pub async fn collect_message(&mut self) -> Result<Message> {
        let mut acc = StreamAccumulator::new();
        loop {
            match self.recv().await? {
                StreamFrame::Chunk(chunk) => acc.process_chunk(&chunk),
                StreamFrame::End(last) => {
                    if let Some(chunk) = last {
                        acc.process_chunk(&chunk);
                    }
                    break;
                }
            }
        }
        self.close();
        Ok(acc.into_message())
    }
}

async fn read_to_end(mut stream: ByteStream) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk?);
    }
    Ok(body)
}
