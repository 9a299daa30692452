//! reqwest implementation of the backend REST API

use super::types::{
    Conversation, CreateConversationRequest, CreateSessionRequest, Generation, Message,
    ModelAssignments, Session, UpdateSessionRequest,
};
use super::{ApiError, StudioApi};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Map;
use std::time::Duration;

/// Backend client over HTTP
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(operation, status = status.as_u16(), "API request rejected");
            return Err(ApiError::Status {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| ApiError::Decode { operation, source })
    }
}

#[async_trait]
impl StudioApi for HttpApi {
    async fn create_session(&self, model_assignments: &ModelAssignments) -> Result<Session, ApiError> {
        let request = self
            .client
            .post(self.url("/api/sessions/"))
            .json(&CreateSessionRequest {
                model_assignments,
                settings: Map::new(),
            });
        self.fetch("create session", request).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Session, ApiError> {
        let request = self.client.get(self.url(&format!("/api/sessions/{session_id}")));
        self.fetch("get session", request).await
    }

    async fn update_session(
        &self,
        session_id: &str,
        model_assignments: &ModelAssignments,
    ) -> Result<Session, ApiError> {
        let request = self
            .client
            .patch(self.url(&format!("/api/sessions/{session_id}")))
            .json(&UpdateSessionRequest { model_assignments });
        self.fetch("update session", request).await
    }

    async fn create_conversation(&self, session_id: &str) -> Result<Conversation, ApiError> {
        let request = self
            .client
            .post(self.url("/api/chat/conversations"))
            .json(&CreateConversationRequest { session_id });
        self.fetch("create conversation", request).await
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError> {
        let request = self.client.get(self.url(&format!(
            "/api/chat/conversations/{conversation_id}/messages"
        )));
        self.fetch("get messages", request).await
    }

    async fn list_generations(&self, conversation_id: &str) -> Result<Vec<Generation>, ApiError> {
        let request = self.client.get(self.url(&format!(
            "/api/generations/conversation/{conversation_id}"
        )));
        self.fetch("list generations", request).await
    }
}
