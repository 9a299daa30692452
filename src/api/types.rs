//! Wire types shared by the REST API and the message stream

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Specialist role name → model name
pub type ModelAssignments = BTreeMap<String, String>;

/// Top-level container for model-to-specialist assignments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub model_assignments: ModelAssignments,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

/// Conversation phase, owned and advanced by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Ideation,
    Refinement,
    Synthesis,
    Review,
    Generating,
    Complete,
}

impl ConversationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversationStatus::Ideation => "ideation",
            ConversationStatus::Refinement => "refinement",
            ConversationStatus::Synthesis => "synthesis",
            ConversationStatus::Review => "review",
            ConversationStatus::Generating => "generating",
            ConversationStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub session_id: String,
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Style,
    Composition,
    Story,
    Technical,
    Critic,
    System,
}

impl Role {
    /// The five specialist personas, in roster order
    pub const SPECIALISTS: [Role; 5] = [
        Role::Style,
        Role::Composition,
        Role::Story,
        Role::Technical,
        Role::Critic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Style => "style",
            Role::Composition => "composition",
            Role::Story => "story",
            Role::Technical => "technical",
            Role::Critic => "critic",
            Role::System => "system",
        }
    }

    pub fn is_specialist(self) -> bool {
        !matches!(self, Role::User | Role::System)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Specialist display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A finalized chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub metadata: MessageMetadata,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Optimistic user message with a client-generated id
    pub fn user(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            role: Role::User,
            content: content.into(),
            metadata: MessageMetadata::default(),
            created_at: Utc::now(),
        }
    }

    /// Completed specialist turn assembled on the client
    pub fn specialist(
        conversation_id: impl Into<String>,
        role: Role,
        name: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            role,
            content: content.into(),
            metadata: MessageMetadata { name },
            created_at: Utc::now(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Queued,
    Running,
    Complete,
    Failed,
}

/// Image generation job launched by a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub id: String,
    pub status: GenerationStatus,
    /// Percent complete, 0-100
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Generation {
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            GenerationStatus::Queued | GenerationStatus::Running
        )
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateSessionRequest<'a> {
    pub model_assignments: &'a ModelAssignments,
    pub settings: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateSessionRequest<'a> {
    pub model_assignments: &'a ModelAssignments,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateConversationRequest<'a> {
    pub session_id: &'a str,
}
