//! Job records
//!
//! A job is a server-tracked unit of background work (an email fetch, an
//! extraction pass, ...) with a lifecycle status.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::timestamp;

/// Job record as returned by `GET /api/v1/jobs/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier, immutable once created
    pub id: i64,

    /// Kind of background operation (e.g. `run_email_fetch`)
    pub job_type: String,

    /// Raw lifecycle status string; see [`Job::lifecycle`]
    pub status: String,

    /// Initiator tag (`CRON`, `MANUAL`, `API`, `RETRY`); absent for system jobs
    #[serde(default)]
    pub triggered_by: Option<String>,

    #[serde(default)]
    pub user_id: Option<i64>,

    #[serde(default)]
    pub input_payload: Option<JsonValue>,

    /// Populated once the job reaches a terminal state
    #[serde(default)]
    pub output_payload: Option<JsonValue>,

    /// Populated once the job fails; may coexist with `output_payload`
    #[serde(default)]
    pub error_payload: Option<JsonValue>,

    #[serde(default)]
    pub retry_count: u32,

    /// Always set by the server; tolerated as missing and ordered as oldest
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, with = "timestamp::option")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, with = "timestamp::option")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Lifecycle states a job moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Map a raw status string (any case, including server aliases) to a lifecycle state.
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" | "pending" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "success" | "succeeded" | "completed" => Some(JobStatus::Succeeded),
            "failed" | "error" => Some(JobStatus::Failed),
            "cancelled" | "canceled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "success",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Job {
    pub fn lifecycle(&self) -> Option<JobStatus> {
        JobStatus::from_raw(&self.status)
    }

    /// Run time of a finished job.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => Some(finished - started),
            _ => None,
        }
    }

    /// Serialized error payload, as matched by the text search. `None` when absent.
    pub fn error_text(&self) -> Option<String> {
        self.error_payload
            .as_ref()
            .filter(|payload| !payload.is_null())
            .map(|payload| payload.to_string())
    }

    /// Account the job operated on, looked up in the input payload then the output payload.
    pub fn account_id(&self) -> Option<i64> {
        self.input_payload
            .as_ref()
            .and_then(payload_account_id)
            .or_else(|| self.output_payload.as_ref().and_then(payload_account_id))
    }

    /// Lifecycle invariants this record violates. The client reports these, it never repairs them.
    pub fn consistency_issues(&self) -> Vec<&'static str> {
        let mut issues = Vec::new();

        if self.finished_at.is_some() && self.started_at.is_none() {
            issues.push("finished_at set without started_at");
        }
        if let (Some(started), Some(finished)) = (self.started_at, self.finished_at)
            && started > finished
        {
            issues.push("started_at is after finished_at");
        }

        match self.lifecycle() {
            Some(JobStatus::Running) => {
                if self.started_at.is_none() {
                    issues.push("running without started_at");
                }
                if self.finished_at.is_some() {
                    issues.push("running with finished_at");
                }
            }
            Some(JobStatus::Queued) if self.started_at.is_some() => {
                issues.push("queued with started_at");
            }
            Some(JobStatus::Failed) if self.error_payload.is_none() => {
                issues.push("failed without error_payload");
            }
            None => issues.push("unknown status"),
            _ => {}
        }

        issues
    }
}

/// Keys consulted, in order, for an account reference inside an untyped payload.
const ACCOUNT_ID_KEYS: [&str; 3] = ["account_id", "connected_account_id", "email_connection_id"];

/// Extract an account reference from a job payload.
///
/// Producers disagree on the key name, so the keys in [`ACCOUNT_ID_KEYS`] are
/// tried in order and the first usable value wins. Integers and integer strings
/// are accepted; anything else under a key is skipped.
pub fn payload_account_id(payload: &JsonValue) -> Option<i64> {
    let object = payload.as_object()?;
    ACCOUNT_ID_KEYS.iter().find_map(|key| match object.get(*key)? {
        JsonValue::Number(number) => number.as_i64(),
        JsonValue::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Count of jobs per lifecycle state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStats {
    pub total: usize,
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub unknown: usize,
}

impl JobStats {
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Self {
        let mut stats = JobStats::default();
        for job in jobs {
            stats.total += 1;
            match job.lifecycle() {
                Some(JobStatus::Queued) => stats.queued += 1,
                Some(JobStatus::Running) => stats.running += 1,
                Some(JobStatus::Succeeded) => stats.succeeded += 1,
                Some(JobStatus::Failed) => stats.failed += 1,
                Some(JobStatus::Cancelled) => stats.cancelled += 1,
                None => stats.unknown += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn job_from(value: JsonValue) -> Job {
        serde_json::from_value(value).expect("valid job json")
    }

    #[test]
    fn deserializes_server_record() {
        let job = job_from(json!({
            "id": 7,
            "job_type": "run_email_fetch",
            "status": "SUCCESS",
            "triggered_by": "CRON",
            "user_id": 3,
            "input_payload": {"user_id": 3, "account_id": 11},
            "output_payload": {"fetched": 10},
            "error_payload": null,
            "retry_count": 0,
            "started_at": "2024-01-01T10:00:01",
            "finished_at": "2024-01-01T10:00:31",
            "created_at": "2024-01-01T10:00:00Z"
        }));

        assert_eq!(job.lifecycle(), Some(JobStatus::Succeeded));
        assert_eq!(job.duration(), Some(Duration::seconds(30)));
        assert_eq!(job.error_text(), None);
        assert_eq!(job.account_id(), Some(11));
        assert_eq!(
            job.created_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
        );
        assert!(job.consistency_issues().is_empty());
    }

    #[test]
    fn tolerates_missing_optional_fields() {
        let job = job_from(json!({"id": 1, "job_type": "run_email_extraction", "status": "queued"}));
        assert_eq!(job.created_at, None);
        assert_eq!(job.triggered_by, None);
        assert_eq!(job.retry_count, 0);
    }

    #[test]
    fn rejects_negative_retry_count() {
        let result = serde_json::from_value::<Job>(json!({
            "id": 1, "job_type": "x", "status": "queued", "retry_count": -1
        }));
        assert!(result.is_err());
    }

    #[test]
    fn status_aliases_map_to_lifecycle() {
        assert_eq!(JobStatus::from_raw("PENDING"), Some(JobStatus::Queued));
        assert_eq!(JobStatus::from_raw("completed"), Some(JobStatus::Succeeded));
        assert_eq!(JobStatus::from_raw("Error"), Some(JobStatus::Failed));
        assert_eq!(JobStatus::from_raw("canceled"), Some(JobStatus::Cancelled));
        assert_eq!(JobStatus::from_raw("paused"), None);
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn flags_inconsistent_lifecycle() {
        let job = job_from(json!({
            "id": 2,
            "job_type": "run_email_fetch",
            "status": "RUNNING",
            "created_at": "2024-01-01T10:00:00Z",
            "finished_at": "2024-01-01T10:05:00Z"
        }));
        let issues = job.consistency_issues();
        assert!(issues.contains(&"finished_at set without started_at"));
        assert!(issues.contains(&"running without started_at"));
        assert!(issues.contains(&"running with finished_at"));
    }

    #[test]
    fn account_id_fallback_order() {
        assert_eq!(payload_account_id(&json!({"account_id": 4, "connected_account_id": 9})), Some(4));
        assert_eq!(payload_account_id(&json!({"connected_account_id": "9"})), Some(9));
        assert_eq!(payload_account_id(&json!({"account_id": null, "email_connection_id": 5})), Some(5));
        assert_eq!(payload_account_id(&json!({"account_id": "abc"})), None);
        assert_eq!(payload_account_id(&json!([1, 2])), None);
    }

    #[test]
    fn stats_count_each_state() {
        let jobs = vec![
            job_from(json!({"id": 1, "job_type": "a", "status": "SUCCESS"})),
            job_from(json!({"id": 2, "job_type": "a", "status": "FAILED"})),
            job_from(json!({"id": 3, "job_type": "a", "status": "failed"})),
            job_from(json!({"id": 4, "job_type": "a", "status": "weird"})),
        ];
        let stats = JobStats::from_jobs(&jobs);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.unknown, 1);
    }
}
