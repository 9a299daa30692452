//! Stream record transition table
//!
//! `transition` reads the current preview and decides what a record does;
//! `ChatState::apply` carries it out. Keeping the decision free of I/O and
//! locking lets the property tests drive it directly.

use super::event::StreamEvent;
use super::state::StreamingMessage;
use crate::api::{ConversationStatus, Message, Role};

/// Attribution for turns whose records carry no usable role
pub const UNATTRIBUTED: Role = Role::System;

/// What a single record does to the chat state
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// No observable change
    Ignore,
    /// Replace any preview with a fresh, empty one
    StartPreview(StreamingMessage),
    /// Append to the open preview
    ExtendPreview(String),
    /// Append a finalized message and clear the preview
    Finalize(Message),
    Phase(ConversationStatus),
}

/// Turn-level facts a record needs but does not carry
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    pub conversation_id: &'a str,
}

pub fn transition(
    preview: Option<&StreamingMessage>,
    context: &TurnContext<'_>,
    event: StreamEvent,
) -> Transition {
    match event {
        StreamEvent::SpecialistStart { role, name } => Transition::StartPreview(
            StreamingMessage::new(role.unwrap_or(UNATTRIBUTED), name),
        ),

        // A chunk only means something inside an open turn
        StreamEvent::SpecialistChunk { content } => {
            if preview.is_some() && !content.is_empty() {
                Transition::ExtendPreview(content)
            } else {
                Transition::Ignore
            }
        }

        // Always finalizes, from the record's own fields, whether or not a
        // matching preview is open. Missing attribution comes from the open
        // preview, else the turn is unattributed.
        StreamEvent::SpecialistEnd {
            role,
            name,
            content,
        } => {
            let role = role
                .or(preview.map(|p| p.role))
                .unwrap_or(UNATTRIBUTED);
            let name = name.filter(|n| !n.is_empty()).or_else(|| {
                preview
                    .filter(|p| p.role == role && !p.name.is_empty())
                    .map(|p| p.name.clone())
            });
            Transition::Finalize(Message::specialist(
                context.conversation_id,
                role,
                name,
                content,
            ))
        }

        StreamEvent::PhaseChange { phase } => Transition::Phase(phase),

        StreamEvent::UserMessage { .. } => Transition::Ignore,
    }
}
