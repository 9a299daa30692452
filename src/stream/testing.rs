//! Scripted transport for testing
//!
//! Each `open` pops the next queued outcome. Queued bodies are fed by the
//! test through a `ScriptedBody`, so chunk boundaries and timing are exact.

use super::{ByteStream, StreamError, StreamRequest, StreamTransport};
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Transport returning pre-queued bodies
#[derive(Default)]
pub struct ScriptedTransport {
    opens: Mutex<VecDeque<Result<ByteStream, StreamError>>>,
    requests: Mutex<Vec<StreamRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful open; the returned body is driven by the test
    pub fn queue_stream(&self) -> ScriptedBody {
        let (tx, rx) = mpsc::unbounded();
        self.opens.lock().unwrap().push_back(Ok(rx.boxed()));
        ScriptedBody { tx }
    }

    /// Queue an open that fails before any body is available
    pub fn queue_open_error(&self, error: StreamError) {
        self.opens.lock().unwrap().push_back(Err(error));
    }

    /// Every request opened so far
    pub fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamTransport for ScriptedTransport {
    async fn open(&self, request: &StreamRequest) -> Result<ByteStream, StreamError> {
        self.requests.lock().unwrap().push(request.clone());
        self.opens
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(StreamError::network("No scripted stream queued")))
    }
}

/// Write side of a scripted body. Dropping it ends the body cleanly.
pub struct ScriptedBody {
    tx: mpsc::UnboundedSender<Result<Vec<u8>, StreamError>>,
}

impl ScriptedBody {
    /// Deliver raw bytes as one read
    pub fn chunk(&self, bytes: &[u8]) {
        // The reader may already be gone after a cancel
        let _ = self.tx.unbounded_send(Ok(bytes.to_vec()));
    }

    /// Deliver one complete `data: ` line
    pub fn frame(&self, payload: &str) {
        self.chunk(format!("data: {payload}\n").as_bytes());
    }

    /// Fail the next read
    pub fn fail(&self, error: StreamError) {
        let _ = self.tx.unbounded_send(Err(error));
    }

    /// End the body
    pub fn close(&self) {
        self.tx.close_channel();
    }
}
