//! Search and sort projections for the email and account listings.

use crate::jobs::SortOrder;
use crate::jobs::view::search_needle;
use crate::models::{ConnectedAccount, EmailRecord};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmailQuery {
    /// Substring matched against subject and provider, ignoring case
    pub search: String,
    /// Ordering applied to `received_at`
    pub order: SortOrder,
}

fn email_matches(email: &EmailRecord, needle: &str) -> bool {
    needle.is_empty()
        || email.provider.to_lowercase().contains(needle)
        || email
            .subject
            .as_deref()
            .is_some_and(|subject| subject.to_lowercase().contains(needle))
}

/// Filter by search, then stable-sort on `received_at`.
pub fn project_emails(emails: &[EmailRecord], query: &EmailQuery) -> Vec<EmailRecord> {
    let needle = search_needle(&query.search);

    let mut display: Vec<EmailRecord> = emails
        .iter()
        .filter(|email| email_matches(email, &needle))
        .cloned()
        .collect();

    display.sort_by(|a, b| match query.order {
        SortOrder::Asc => a.received_at.cmp(&b.received_at),
        SortOrder::Desc => b.received_at.cmp(&a.received_at),
    });

    display
}

/// Accounts still waiting for the provider authorization flow.
pub fn pending_accounts(accounts: &[ConnectedAccount]) -> Vec<&ConnectedAccount> {
    accounts.iter().filter(|a| !a.is_authorized()).collect()
}
