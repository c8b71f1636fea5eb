//! Fetched email records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Older API builds name this column `email_connection_id`.
    #[serde(default, alias = "email_connection_id")]
    pub connected_account_id: Option<i64>,
    pub provider: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(with = "timestamp")]
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub extraction_status: Option<String>,
}

impl EmailRecord {
    pub fn subject_or_placeholder(&self) -> &str {
        self.subject.as_deref().unwrap_or("(no subject)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_either_account_key() {
        let current: EmailRecord = serde_json::from_value(json!({
            "id": 1, "provider": "gmail", "connected_account_id": 4,
            "subject": "Receipt", "received_at": "2024-02-01T08:00:00Z"
        }))
        .unwrap();
        let legacy: EmailRecord = serde_json::from_value(json!({
            "id": 2, "provider": "gmail", "email_connection_id": 4,
            "received_at": "2024-02-01T08:00:00"
        }))
        .unwrap();

        assert_eq!(current.connected_account_id, Some(4));
        assert_eq!(legacy.connected_account_id, Some(4));
        assert_eq!(legacy.subject_or_placeholder(), "(no subject)");
    }
}
