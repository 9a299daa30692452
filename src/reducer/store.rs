//! Chat store: owns the chat state and the single active stream
//!
//! Every send gets a fresh stream id. Records, failures, and timeouts are
//! applied only while their id is still the active one, and the check and
//! the mutation happen under the same lock. A superseded or cancelled stream
//! therefore cannot change state even if one of its frames is already in
//! flight when the cancel lands.
//!
//! The safety timeout only clears the streaming flag. The stream stays the
//! active one until its body ends, it fails, or it is cancelled or
//! superseded.

use super::event::StreamEvent;
use super::state::{ChatState, ChatUpdate, StreamingMessage};
use super::transition::{transition, TurnContext};
use crate::api::{ConversationStatus, Message};
use crate::stream::{spawn_stream, CancelHandle, StreamError, StreamRequest, StreamTransport};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;

pub const DEFAULT_SAFETY_TIMEOUT: Duration = Duration::from_secs(30);

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Message list, streaming preview, and send entry point for one view
pub struct ChatStore<T: ?Sized> {
    transport: Arc<T>,
    shared: Arc<Shared>,
    safety_timeout: Duration,
}

struct Shared {
    inner: Mutex<Inner>,
    updates: broadcast::Sender<ChatUpdate>,
}

#[derive(Default)]
struct Inner {
    state: ChatState,
    active: Option<ActiveStream>,
    last_stream_id: u64,
}

struct ActiveStream {
    id: u64,
    conversation_id: String,
    /// Set once the reader is running
    cancel: Option<CancelHandle>,
}

impl Inner {
    fn is_active(&self, stream_id: u64) -> bool {
        self.active.as_ref().is_some_and(|a| a.id == stream_id)
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called with the lock held so observers see updates in mutation order
    fn publish(&self, updates: Vec<ChatUpdate>) {
        for update in updates {
            // No receivers is fine
            let _ = self.updates.send(update);
        }
    }

    fn apply_frame(&self, stream_id: u64, data: &str) {
        let event = match StreamEvent::parse(data) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(stream_id, error = %e, "Dropping malformed stream record");
                return;
            }
        };

        let mut inner = self.lock();
        let Some(active) = inner.active.as_ref().filter(|a| a.id == stream_id) else {
            tracing::trace!(stream_id, kind = event.kind(), "Dropping record from inactive stream");
            return;
        };

        if let StreamEvent::SpecialistEnd { role, .. } = &event {
            match (&inner.state.streaming_message, role) {
                (None, None) => {
                    tracing::warn!(stream_id, "Finalizing unattributed specialist_end with no open turn");
                }
                (None, Some(role)) => {
                    tracing::debug!(stream_id, %role, "specialist_end without an open turn");
                }
                (Some(open), Some(role)) if open.role != *role => tracing::debug!(
                    stream_id,
                    open = %open.role,
                    %role,
                    "specialist_end role differs from the open turn"
                ),
                (Some(_), _) => {}
            }
        }
        if let StreamEvent::SpecialistStart { role: None, .. } = &event {
            tracing::debug!(stream_id, "specialist_start without a recognized role");
        }

        let context = TurnContext {
            conversation_id: &active.conversation_id,
        };
        let result = transition(inner.state.streaming_message.as_ref(), &context, event);
        let updates = inner.state.apply(result);
        self.publish(updates);
    }

    /// Release `stream_id` if it is still active. Returns whether it was.
    fn end_stream(&self, stream_id: u64) -> bool {
        let mut inner = self.lock();
        if !inner.is_active(stream_id) {
            return false;
        }

        if let Some(cancel) = inner.active.take().and_then(|a| a.cancel) {
            cancel.cancel();
        }
        if let Some(open) = &inner.state.streaming_message {
            tracing::debug!(
                stream_id,
                role = %open.role,
                chars = open.content.len(),
                "Discarding unfinished turn"
            );
        }
        let updates = inner.state.stop_streaming();
        self.publish(updates);
        true
    }

    /// Safety timeout: drop the streaming flag only. The stream stays active,
    /// so a slow turn still lands once its records arrive.
    fn expire(&self, stream_id: u64) -> bool {
        let mut inner = self.lock();
        if !inner.is_active(stream_id) || !inner.state.is_streaming {
            return false;
        }
        inner.state.is_streaming = false;
        self.publish(vec![ChatUpdate::Streaming(false)]);
        true
    }

    fn fail(&self, stream_id: u64, error: &StreamError) {
        if self.end_stream(stream_id) {
            tracing::error!(stream_id, kind = ?error.kind, error = %error, "Message stream failed");
        }
    }
}

impl<T: ?Sized> ChatStore<T> {
    pub fn new(transport: Arc<T>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            transport,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                updates,
            }),
            safety_timeout: DEFAULT_SAFETY_TIMEOUT,
        }
    }

    /// Longest a send may stay streaming without a terminal signal
    pub fn with_safety_timeout(mut self, timeout: Duration) -> Self {
        self.safety_timeout = timeout;
        self
    }

    /// Change notifications from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ChatUpdate> {
        self.shared.updates.subscribe()
    }

    pub fn snapshot(&self) -> ChatState {
        self.shared.lock().state.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.shared.lock().state.messages.clone()
    }

    pub fn streaming_message(&self) -> Option<StreamingMessage> {
        self.shared.lock().state.streaming_message.clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.lock().state.is_streaming
    }

    pub fn phase(&self) -> Option<ConversationStatus> {
        self.shared.lock().state.phase
    }

    /// Replace the finalized history, e.g. after loading it from the
    /// backend. Streaming state is left alone.
    pub fn set_messages(&self, messages: Vec<Message>) {
        let mut inner = self.shared.lock();
        let count = messages.len();
        inner.state.messages = messages;
        self.shared.publish(vec![ChatUpdate::MessagesReplaced { count }]);
    }

    pub fn add_message(&self, message: Message) {
        let mut inner = self.shared.lock();
        inner.state.messages.push(message.clone());
        self.shared.publish(vec![ChatUpdate::MessageAdded(message)]);
    }

    /// Stop the active stream without treating it as an error. Returns
    /// whether there was one.
    pub fn cancel(&self) -> bool {
        let stream_id = match &self.shared.lock().active {
            Some(active) => active.id,
            None => return false,
        };
        let ended = self.shared.end_stream(stream_id);
        if ended {
            tracing::debug!(stream_id, "Message stream cancelled");
        }
        ended
    }
}

impl<T> ChatStore<T>
where
    T: StreamTransport + ?Sized + 'static,
{
    /// Post `content` to the conversation and stream the specialists' reply.
    ///
    /// The user message is appended before this returns; its id is returned.
    /// Any stream still running is cancelled first. Must be called from
    /// within a tokio runtime.
    pub fn send(&self, conversation_id: &str, content: &str) -> String {
        let message = Message::user(conversation_id, content);
        let message_id = message.id.clone();

        let stream_id = {
            let mut inner = self.shared.lock();
            if let Some(previous) = inner.active.take() {
                tracing::debug!(stream_id = previous.id, "Superseding active stream");
                if let Some(cancel) = previous.cancel {
                    cancel.cancel();
                }
            }

            inner.last_stream_id += 1;
            let stream_id = inner.last_stream_id;
            inner.active = Some(ActiveStream {
                id: stream_id,
                conversation_id: conversation_id.to_string(),
                cancel: None,
            });

            let mut updates = Vec::new();
            // A superseded turn's preview must not bleed into this one
            if inner.state.streaming_message.take().is_some() {
                updates.push(ChatUpdate::Preview(None));
            }
            inner.state.messages.push(message.clone());
            updates.push(ChatUpdate::MessageAdded(message));
            if !inner.state.is_streaming {
                inner.state.is_streaming = true;
                updates.push(ChatUpdate::Streaming(true));
            }
            self.shared.publish(updates);
            stream_id
        };

        tracing::debug!(stream_id, conversation_id, "Opening message stream");

        let on_event = {
            let shared = Arc::clone(&self.shared);
            move |data: String| shared.apply_frame(stream_id, &data)
        };
        let on_error = {
            let shared = Arc::clone(&self.shared);
            move |error: StreamError| shared.fail(stream_id, &error)
        };
        let handle = spawn_stream(
            Arc::clone(&self.transport),
            StreamRequest::new(conversation_id, content),
            on_event,
            on_error,
        );
        let cancel = handle.cancel_handle();

        {
            let mut inner = self.shared.lock();
            match inner.active.as_mut().filter(|a| a.id == stream_id) {
                Some(active) => active.cancel = Some(cancel.clone()),
                // Superseded, cancelled, or already failed
                None => cancel.cancel(),
            }
        }

        let shared = Arc::clone(&self.shared);
        let safety_timeout = self.safety_timeout;
        tokio::spawn(async move {
            let finished = handle.finished();
            tokio::pin!(finished);
            tokio::select! {
                () = &mut finished => {}
                () = tokio::time::sleep(safety_timeout) => {
                    if shared.expire(stream_id) {
                        tracing::warn!(
                            stream_id,
                            timeout_secs = safety_timeout.as_secs(),
                            "No end of stream before safety timeout"
                        );
                    }
                    // Records keep applying until the body actually ends
                    finished.await;
                }
            }
            if shared.end_stream(stream_id) {
                tracing::debug!(stream_id, "Message stream closed");
            }
        });

        message_id
    }
}

impl<T: ?Sized> Drop for ChatStore<T> {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        if let Some(cancel) = inner.active.take().and_then(|a| a.cancel) {
            cancel.cancel();
        }
    }
}
