//! Transport abstraction for the message stream
//!
//! The reducer only needs "open this request, give me its body as bytes".
//! Keeping that behind a trait lets tests script chunk boundaries exactly.

use super::StreamError;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Raw response body, chunked however the network delivered it
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, StreamError>>;

/// One message submission that answers with an event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub conversation_id: String,
    pub content: String,
}

impl StreamRequest {
    pub fn new(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            content: content.into(),
        }
    }
}

/// Opens a streamed response for a request
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Issue the request. Fails on connection errors and non-success
    /// responses; once the body is handed back, read errors surface as
    /// items of the stream.
    async fn open(&self, request: &StreamRequest) -> Result<ByteStream, StreamError>;
}

#[async_trait]
impl<T: StreamTransport + ?Sized> StreamTransport for Arc<T> {
    async fn open(&self, request: &StreamRequest) -> Result<ByteStream, StreamError> {
        (**self).open(request).await
    }
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    content: &'a str,
}

/// `POST /api/chat/conversations/{id}/messages` over reqwest
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, StreamError> {
        // No whole-request timeout: a turn with several specialists can
        // stream for minutes.
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| StreamError::unknown(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn messages_url(&self, conversation_id: &str) -> String {
        format!(
            "{}/api/chat/conversations/{conversation_id}/messages",
            self.base_url
        )
    }
}

#[async_trait]
impl StreamTransport for HttpTransport {
    async fn open(&self, request: &StreamRequest) -> Result<ByteStream, StreamError> {
        let url = self.messages_url(&request.conversation_id);
        tracing::debug!(url = %url, "Opening message stream");

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(&SendMessageBody {
                content: &request.content,
            })
            .send()
            .await
            .map_err(|e| StreamError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::from_status(status.as_u16(), &body));
        }

        let body = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| StreamError::network(format!("Failed to read stream: {e}")))
        });
        Ok(body.boxed())
    }
}
