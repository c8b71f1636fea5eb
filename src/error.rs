//! # Error Handling
//!
//! Unified error type for every call the client makes against the dashboard API.
//! Each variant maps onto one of the failure classes the monitor degrades on:
//! transport, non-success status, and malformed payload.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ConfigError;

/// Maximum number of characters of a response body kept in an error.
const BODY_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never reached the server or the response never came back.
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success HTTP status.
    #[error("API request failed with status {status}: {detail}")]
    Status { status: StatusCode, detail: String },

    /// Response body did not have the expected JSON shape.
    #[error("Malformed response from {endpoint}: {source}")]
    Malformed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Operation is not offered for the given provider.
    #[error("{provider} integration is not supported for {operation}")]
    Unsupported { provider: String, operation: String },
}

/// FastAPI-style error body: `{"detail": "..."}` or `{"detail": [...]}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl ClientError {
    /// Build a status error from the raw response body, preferring the server's `detail` field.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let detail = match serde_json::from_slice::<ErrorBody>(body) {
            Ok(ErrorBody {
                detail: serde_json::Value::String(message),
            }) => message,
            Ok(ErrorBody { detail }) => truncate(&detail.to_string()),
            Err(_) => {
                let text = String::from_utf8_lossy(body);
                let text = text.trim();
                if text.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown status")
                        .to_string()
                } else {
                    truncate(text)
                }
            }
        };

        ClientError::Status { status, detail }
    }

    pub fn malformed(endpoint: impl Into<String>, source: serde_json::Error) -> Self {
        ClientError::Malformed {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// HTTP status for status errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Short user-facing message suitable for a transient notification.
    pub fn notice_message(&self) -> String {
        match self {
            ClientError::Transport(err) if err.is_timeout() => "Request timed out.".to_string(),
            ClientError::Transport(_) => "Connection error.".to_string(),
            ClientError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED => {
                "Session expired or missing, please log in.".to_string()
            }
            ClientError::Status { detail, .. } => detail.clone(),
            ClientError::Malformed { .. } => "Unexpected response from server.".to_string(),
            ClientError::Url(_) | ClientError::Config(_) => "Invalid request address.".to_string(),
            ClientError::Unsupported { provider, .. } => {
                format!("{} integration is coming soon.", provider.to_uppercase())
            }
        }
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() > BODY_SNIPPET_CHARS {
        let truncated: String = body.chars().take(BODY_SNIPPET_CHARS).collect();
        format!("{}...", truncated)
    } else {
        body.to_string()
    }
}
