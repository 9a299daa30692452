//! Callback-driven stream reader with cooperative cancellation

use super::{FrameDecoder, StreamError, StreamRequest, StreamTransport};
use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Aborts one stream. Cloneable; cancelling twice is harmless.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A running stream reader
#[derive(Debug)]
pub struct StreamHandle {
    cancel: CancelHandle,
    task: JoinHandle<()>,
}

impl StreamHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the reader has stopped, whether it drained the body,
    /// failed, or was cancelled.
    pub async fn finished(self) {
        if let Err(e) = self.task.await {
            if e.is_panic() {
                tracing::error!(error = %e, "Stream reader panicked");
            }
        }
    }
}

/// Open `request` on `transport` and deliver every decoded frame payload to
/// `on_event`, in arrival order.
///
/// `on_error` runs at most once, for a failed request, a non-success
/// response, or a read error. A clean end of the body calls neither
/// callback. After cancellation no further frame is delivered and a failure
/// caused by the abort is not reported.
pub fn spawn_stream<T, E, F>(
    transport: Arc<T>,
    request: StreamRequest,
    on_event: E,
    on_error: F,
) -> StreamHandle
where
    T: StreamTransport + ?Sized + 'static,
    E: FnMut(String) + Send + 'static,
    F: FnOnce(StreamError) + Send + 'static,
{
    let cancel = CancelHandle::default();
    let token = cancel.token.clone();

    let task = tokio::spawn(async move {
        let result = tokio::select! {
            biased;
            () = token.cancelled() => Ok(()),
            result = pump(transport.as_ref(), &request, on_event, &token) => result,
        };

        match result {
            Ok(()) => tracing::debug!(
                conversation_id = %request.conversation_id,
                cancelled = token.is_cancelled(),
                "Stream reader stopped"
            ),
            Err(e) if token.is_cancelled() => tracing::debug!(
                conversation_id = %request.conversation_id,
                error = %e,
                "Ignoring stream failure after cancellation"
            ),
            Err(e) => on_error(e),
        }
    });

    StreamHandle { cancel, task }
}

async fn pump<T, E>(
    transport: &T,
    request: &StreamRequest,
    mut on_event: E,
    token: &CancellationToken,
) -> Result<(), StreamError>
where
    T: StreamTransport + ?Sized,
    E: FnMut(String),
{
    let mut body = transport.open(request).await?;
    let mut decoder = FrameDecoder::new();

    while let Some(chunk) = body.next().await {
        for frame in decoder.push(&chunk?) {
            if token.is_cancelled() {
                return Ok(());
            }
            on_event(frame);
        }
    }

    decoder.finish();
    Ok(())
}
