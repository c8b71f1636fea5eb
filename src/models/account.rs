//! Connected mail accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

/// Provider slug whose accounts support the OAuth authorization flow.
pub const OAUTH_PROVIDER: &str = "gmail";

/// A mailbox linked to the user's profile as a data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedAccount {
    pub id: i64,
    pub provider: String,
    pub email: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Set once the provider's OAuth flow has completed
    #[serde(default, with = "timestamp::option")]
    pub token_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl ConnectedAccount {
    pub fn is_authorized(&self) -> bool {
        self.token_expiry.is_some()
    }

    pub fn supports_oauth(&self) -> bool {
        self.provider.eq_ignore_ascii_case(OAUTH_PROVIDER)
    }
}

/// Body of `POST /api/v1/connected-accounts/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAccount {
    pub provider: String,
    pub email: String,
}

/// Response of the authorize endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorizationLink {
    pub authorization_url: String,
}

/// Headline counts for the dashboard overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountSummary {
    pub total: usize,
    pub authorized: usize,
    pub pending: usize,
}

impl AccountSummary {
    pub fn from_accounts(accounts: &[ConnectedAccount]) -> Self {
        let authorized = accounts.iter().filter(|a| a.is_authorized()).count();
        Self {
            total: accounts.len(),
            authorized,
            pending: accounts.len() - authorized,
        }
    }
}
