//! Records carried by the message stream

use crate::api::{ConversationStatus, Role};
use serde::{Deserialize, Deserializer};

/// One decoded frame of a specialist turn stream
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Echo of the submitted text; the client already shows it
    UserMessage {
        #[serde(default)]
        content: String,
    },
    /// Without a recognized role the turn is unattributed
    SpecialistStart {
        #[serde(default, deserialize_with = "lenient_role")]
        role: Option<Role>,
        #[serde(default)]
        name: String,
    },
    SpecialistChunk {
        #[serde(default)]
        content: String,
    },
    /// Carries the full text of the turn. Without a recognized role it
    /// closes the open preview's turn.
    SpecialistEnd {
        #[serde(default, deserialize_with = "lenient_role")]
        role: Option<Role>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        content: String,
    },
    PhaseChange {
        phase: ConversationStatus,
    },
}

/// Missing, null, and unknown roles all read as `None`
fn lenient_role<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Role>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|role| serde_json::from_value(serde_json::Value::String(role)).ok()))
}

impl StreamEvent {
    /// Parse one frame payload
    pub fn parse(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::UserMessage { .. } => "user_message",
            StreamEvent::SpecialistStart { .. } => "specialist_start",
            StreamEvent::SpecialistChunk { .. } => "specialist_chunk",
            StreamEvent::SpecialistEnd { .. } => "specialist_end",
            StreamEvent::PhaseChange { .. } => "phase_change",
        }
    }
}
