//! Plain-text rendering of listings and the job detail view.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::jobs::MonitorSnapshot;
use crate::models::{AccountSummary, ConnectedAccount, EmailRecord, Job, JobStats, timestamp};
use crate::notify::Notice;

const PLACEHOLDER: &str = "-";

fn when(value: Option<&DateTime<Utc>>) -> String {
    value
        .map(timestamp::format)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn pretty(payload: Option<&JsonValue>) -> String {
    match payload {
        None | Some(JsonValue::Null) => "null".to_string(),
        Some(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
    }
}

pub fn jobs_table(jobs: &[Job]) -> String {
    if jobs.is_empty() {
        return "No jobs found.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:<28} {:<10} {:<8} {:<26} {:<10}",
        "ID", "TYPE", "STATUS", "TRIGGER", "CREATED", "DURATION"
    );
    for job in jobs {
        let duration = job
            .duration()
            .map(|d| format!("{}s", d.num_seconds()))
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let _ = writeln!(
            out,
            "{:<8} {:<28} {:<10} {:<8} {:<26} {:<10}",
            job.id,
            job.job_type,
            job.status,
            job.triggered_by.as_deref().unwrap_or(PLACEHOLDER),
            when(job.created_at.as_ref()),
            duration
        );
    }
    out
}

pub fn job_detail(job: &Job) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Job #{}", job.id);
    let _ = writeln!(out, "  type:        {}", job.job_type);
    let _ = writeln!(out, "  status:      {}", job.status);
    let _ = writeln!(
        out,
        "  triggered:   {}",
        job.triggered_by.as_deref().unwrap_or(PLACEHOLDER)
    );
    let _ = writeln!(out, "  retries:     {}", job.retry_count);
    if let Some(account_id) = job.account_id() {
        let _ = writeln!(out, "  account:     {account_id}");
    }
    let _ = writeln!(out, "  created_at:  {}", when(job.created_at.as_ref()));
    let _ = writeln!(out, "  started_at:  {}", when(job.started_at.as_ref()));
    let _ = writeln!(out, "  finished_at: {}", when(job.finished_at.as_ref()));
    let _ = writeln!(out, "input_payload:\n{}", pretty(job.input_payload.as_ref()));
    let _ = writeln!(out, "output_payload:\n{}", pretty(job.output_payload.as_ref()));
    let _ = writeln!(out, "error_payload:\n{}", pretty(job.error_payload.as_ref()));
    out
}

pub fn job_stats(stats: &JobStats) -> String {
    format!(
        "total {} | queued {} | running {} | success {} | failed {} | cancelled {}",
        stats.total, stats.queued, stats.running, stats.succeeded, stats.failed, stats.cancelled
    )
}

pub fn notices(notices: &[Notice]) -> String {
    notices
        .iter()
        .map(|notice| format!("[{}] {}\n", notice.level, notice.message))
        .collect()
}

/// One frame of the watch view.
pub fn monitor_frame(snapshot: &MonitorSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} (showing {} of {}, status={}, sort={} {})",
        job_stats(&snapshot.stats),
        snapshot.display.len(),
        snapshot.total,
        snapshot.query.status,
        snapshot.query.field,
        snapshot.query.order
    );
    if let Some(error) = &snapshot.last_error {
        let _ = writeln!(out, "last refresh failed: {error}");
    }
    out.push_str(&notices(&snapshot.notices));
    out.push_str(&jobs_table(&snapshot.display));
    out
}

pub fn accounts_table(accounts: &[ConnectedAccount]) -> String {
    let summary = AccountSummary::from_accounts(accounts);
    let mut out = format!(
        "{} accounts, {} authorized, {} pending\n",
        summary.total, summary.authorized, summary.pending
    );
    for account in accounts {
        let state = if account.is_authorized() {
            "authorized"
        } else {
            "pending"
        };
        let _ = writeln!(
            out,
            "{:<6} {:<10} {:<36} {:<10} {}",
            account.id,
            account.provider,
            account.email,
            state,
            when(account.token_expiry.as_ref())
        );
    }
    out
}

pub fn emails_table(emails: &[EmailRecord]) -> String {
    if emails.is_empty() {
        return "No emails found.\n".to_string();
    }

    let mut out = String::new();
    for email in emails {
        let _ = writeln!(
            out,
            "{:<8} {:<10} {:<26} {}",
            email.id,
            email.provider,
            timestamp::format(&email.received_at),
            email.subject_or_placeholder()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detail_shows_every_payload() {
        let job: Job = serde_json::from_value(json!({
            "id": 9, "job_type": "run_email_fetch", "status": "failed",
            "input_payload": {"account_id": 3},
            "output_payload": {"fetched": 2},
            "error_payload": {"message": "Token expired"},
            "started_at": "2024-01-01T10:00:00Z", "finished_at": "2024-01-01T10:00:05Z"
        }))
        .unwrap();

        let text = job_detail(&job);
        assert!(text.contains("Job #9"));
        assert!(text.contains("account:     3"));
        assert!(text.contains("\"fetched\": 2"));
        assert!(text.contains("Token expired"));
    }

    #[test]
    fn missing_payload_renders_null() {
        let job: Job = serde_json::from_value(json!({
            "id": 1, "job_type": "run_email_fetch", "status": "queued"
        }))
        .unwrap();
        let text = job_detail(&job);
        assert!(text.contains("error_payload:\nnull"));
        assert!(text.contains("created_at:  -"));
    }

    #[test]
    fn empty_listings() {
        assert_eq!(jobs_table(&[]), "No jobs found.\n");
        assert_eq!(emails_table(&[]), "No emails found.\n");
        assert!(accounts_table(&[]).starts_with("0 accounts"));
    }
}
