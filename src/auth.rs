//! Access-token providers.
//!
//! Requests never read the bearer token from ambient state; they ask an injected
//! [`TokenProvider`]. The token is established once by a login flow and is
//! read-only for everything downstream.

use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

/// Read-only source of the bearer token attached to API requests.
pub trait TokenProvider: Send + Sync {
    /// Current access token, or `None` to send the request unauthenticated.
    fn access_token(&self) -> Option<String>;
}

/// Token fixed at construction, typically from `JOBWATCH_ACCESS_TOKEN`.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.trim().is_empty()))
    }
}

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Token set exactly once by a login flow and shared process-wide afterwards.
#[derive(Debug, Default)]
pub struct SessionToken {
    token: OnceLock<String>,
}

impl SessionToken {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record the token obtained from login. Returns `false` if a token was already set.
    pub fn establish(&self, token: impl Into<String>) -> bool {
        match self.token.set(token.into()) {
            Ok(()) => {
                debug!("session token established");
                true
            }
            Err(_) => {
                warn!("session token already established; ignoring replacement");
                false
            }
        }
    }

    pub fn is_established(&self) -> bool {
        self.token.get().is_some()
    }
}

impl TokenProvider for SessionToken {
    fn access_token(&self) -> Option<String> {
        self.token.get().cloned()
    }
}
