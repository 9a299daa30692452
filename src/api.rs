//! Backend REST API
//!
//! Session, conversation, history, and generation endpoints. The streaming
//! message endpoint lives in `crate::stream`.

mod client;
mod error;
mod types;

pub use client::HttpApi;
pub use error::ApiError;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Operations the client needs from the backend
#[async_trait]
pub trait StudioApi: Send + Sync {
    /// `POST /api/sessions/`
    async fn create_session(&self, model_assignments: &ModelAssignments) -> Result<Session, ApiError>;

    /// `GET /api/sessions/{id}`
    async fn get_session(&self, session_id: &str) -> Result<Session, ApiError>;

    /// `PATCH /api/sessions/{id}`
    async fn update_session(
        &self,
        session_id: &str,
        model_assignments: &ModelAssignments,
    ) -> Result<Session, ApiError>;

    /// `POST /api/chat/conversations`
    async fn create_conversation(&self, session_id: &str) -> Result<Conversation, ApiError>;

    /// `GET /api/chat/conversations/{id}/messages`, oldest first
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError>;

    /// `GET /api/generations/conversation/{id}`, newest first
    async fn list_generations(&self, conversation_id: &str) -> Result<Vec<Generation>, ApiError>;
}

#[async_trait]
impl<T: StudioApi + ?Sized> StudioApi for Arc<T> {
    async fn create_session(&self, model_assignments: &ModelAssignments) -> Result<Session, ApiError> {
        (**self).create_session(model_assignments).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Session, ApiError> {
        (**self).get_session(session_id).await
    }

    async fn update_session(
        &self,
        session_id: &str,
        model_assignments: &ModelAssignments,
    ) -> Result<Session, ApiError> {
        (**self).update_session(session_id, model_assignments).await
    }

    async fn create_conversation(&self, session_id: &str) -> Result<Conversation, ApiError> {
        (**self).create_conversation(session_id).await
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError> {
        (**self).get_messages(conversation_id).await
    }

    async fn list_generations(&self, conversation_id: &str) -> Result<Vec<Generation>, ApiError> {
        (**self).list_generations(conversation_id).await
    }
}
