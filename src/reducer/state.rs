//! Chat state owned by the reducer

use super::transition::Transition;
use crate::api::{ConversationStatus, Message, Role};

/// Specialist turn still being streamed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingMessage {
    pub role: Role,
    pub name: String,
    /// Only ever grows while the turn is open
    pub content: String,
}

impl StreamingMessage {
    pub fn new(role: Role, name: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
            content: String::new(),
        }
    }
}

/// Everything the UI renders from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    /// Finalized messages in display order
    pub messages: Vec<Message>,
    /// At most one turn in progress
    pub streaming_message: Option<StreamingMessage>,
    pub is_streaming: bool,
    /// Last phase announced by the stream
    pub phase: Option<ConversationStatus>,
}

/// Change notification for observers
#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    /// History replaced wholesale
    MessagesReplaced { count: usize },
    MessageAdded(Message),
    /// Preview started, grew, or went away
    Preview(Option<StreamingMessage>),
    Streaming(bool),
    Phase(ConversationStatus),
}

impl ChatState {
    /// Apply the outcome of one stream record.
    ///
    /// Returns the notifications describing what changed, empty when the
    /// record was a no-op.
    pub fn apply(&mut self, transition: Transition) -> Vec<ChatUpdate> {
        match transition {
            Transition::Ignore => vec![],
            Transition::StartPreview(preview) => {
                self.streaming_message = Some(preview.clone());
                vec![ChatUpdate::Preview(Some(preview))]
            }
            Transition::ExtendPreview(chunk) => match self.streaming_message.as_mut() {
                Some(preview) => {
                    preview.content.push_str(&chunk);
                    vec![ChatUpdate::Preview(Some(preview.clone()))]
                }
                None => vec![],
            },
            Transition::Finalize(message) => {
                self.messages.push(message.clone());
                let mut updates = vec![ChatUpdate::MessageAdded(message)];
                if self.streaming_message.take().is_some() {
                    updates.push(ChatUpdate::Preview(None));
                }
                updates
            }
            Transition::Phase(phase) => {
                self.phase = Some(phase);
                vec![ChatUpdate::Phase(phase)]
            }
        }
    }

    /// Leave the streaming state, discarding any partial turn
    pub fn stop_streaming(&mut self) -> Vec<ChatUpdate> {
        let mut updates = Vec::new();
        if self.streaming_message.take().is_some() {
            updates.push(ChatUpdate::Preview(None));
        }
        if self.is_streaming {
            self.is_streaming = false;
            updates.push(ChatUpdate::Streaming(false));
        }
        updates
    }
}
