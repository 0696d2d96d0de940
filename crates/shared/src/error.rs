use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The call never completed (connect failure, timeout, dropped body).
    Network,
    /// No credential was available, or the server rejected it.
    AuthRequired,
    /// Input was rejected locally before anything was sent.
    Validation,
    /// The call completed with an error status or an unreadable body.
    Server,
}

#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn auth_required(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthRequired, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn server(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Server,
            status,
            message: message.into(),
        }
    }

    /// Maps a completed-but-failed HTTP status to a failure. 401/403 mean the
    /// credential was missing or rejected; everything else is a server failure.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => ErrorKind::AuthRequired,
            _ => ErrorKind::Server,
        };
        Self {
            kind,
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn is_auth(&self) -> bool {
        self.kind == ErrorKind::AuthRequired
    }
}

/// Error body returned by the backend (`{"detail": ...}`). Validation errors
/// carry a list of objects instead of a string, so `detail` stays untyped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: serde_json::Value,
}

impl ErrorDetail {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(text) => text.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|msg| msg.as_str()))
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}
