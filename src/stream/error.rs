//! Stream transport error types

use thiserror::Error;

/// Transport failure with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StreamError {
    pub kind: StreamErrorKind,
    pub message: String,
    /// HTTP status of the triggering response, when there was one
    pub status: Option<u16>,
}

impl StreamError {
    pub fn new(kind: StreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Network, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Unknown, message)
    }

    /// Classify a non-success response
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            400..=499 => StreamErrorKind::ClientError,
            500..=599 => StreamErrorKind::ServerError,
            _ => StreamErrorKind::Unknown,
        };
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        };
        Self {
            kind,
            message,
            status: Some(status),
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// Connection refused, reset, or dropped mid-body
    Network,
    /// 4xx response
    ClientError,
    /// 5xx response
    ServerError,
    Unknown,
}
