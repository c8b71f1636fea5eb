//! Filter, search and sort projection of the raw jobs collection.
//!
//! [`project`] is pure: it never mutates its input and returns the same
//! output for the same inputs, so it can run on every input change.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::models::Job;

/// Status filter chosen in the view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    /// Keep jobs whose raw status equals this value, ignoring case
    Only(String),
}

impl StatusFilter {
    /// Parse user input; empty or `all` (any case) means no filtering.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            StatusFilter::All
        } else {
            StatusFilter::Only(trimmed.to_string())
        }
    }

    pub fn matches(&self, job: &Job) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => job.status.to_lowercase() == status.to_lowercase(),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => f.write_str(status),
        }
    }
}

/// Ordering applied to `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("sort order must be 'asc' or 'desc', got '{other}'")),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        })
    }
}

/// Column the display sequence is ordered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    Id,
    JobType,
}

impl SortField {
    fn compare(self, a: &Job, b: &Job) -> Ordering {
        match self {
            // `None` orders before any timestamp, i.e. as the oldest value.
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Id => a.id.cmp(&b.id),
            SortField::JobType => a.job_type.cmp(&b.job_type),
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created_at" | "created" => Ok(SortField::CreatedAt),
            "id" => Ok(SortField::Id),
            "job_type" | "type" => Ok(SortField::JobType),
            other => Err(format!(
                "sort field must be 'created_at', 'id' or 'job_type', got '{other}'"
            )),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortField::CreatedAt => "created_at",
            SortField::Id => "id",
            SortField::JobType => "job_type",
        })
    }
}

/// Inputs of the projection besides the collection itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobQuery {
    pub status: StatusFilter,
    /// Exact job type to keep, ignoring case
    pub job_type: Option<String>,
    /// Substring matched against `job_type` and the serialized `error_payload`
    pub search: String,
    pub field: SortField,
    pub order: SortOrder,
}

impl JobQuery {
    /// Column-header click: the current column flips its order, another
    /// column becomes current with descending order.
    pub fn sort_by(&mut self, field: SortField) {
        if self.field == field {
            self.order = self.order.toggled();
        } else {
            self.field = field;
            self.order = SortOrder::Desc;
        }
    }

    fn matches_type(&self, job: &Job) -> bool {
        match &self.job_type {
            Some(job_type) => job.job_type.to_lowercase() == job_type.to_lowercase(),
            None => true,
        }
    }
}

/// Normalized search needle: surrounding whitespace is ignored, matching is case-insensitive.
pub(crate) fn search_needle(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Search predicate. `needle` comes from [`search_needle`]; empty matches everything.
fn matches_search(job: &Job, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    if job.job_type.to_lowercase().contains(needle) {
        return true;
    }
    job.error_text()
        .is_some_and(|text| text.to_lowercase().contains(needle))
}

/// Derive the display sequence: status filter, type filter, search, then a
/// stable sort on the chosen column (`created_at` by default). Ties keep fetch
/// order; a missing `created_at` sorts as the oldest value.
pub fn project(jobs: &[Job], query: &JobQuery) -> Vec<Job> {
    let needle = search_needle(&query.search);

    let mut display: Vec<Job> = jobs
        .iter()
        .filter(|job| query.status.matches(job))
        .filter(|job| query.matches_type(job))
        .filter(|job| matches_search(job, &needle))
        .cloned()
        .collect();

    // `sort_by` is stable.
    display.sort_by(|a, b| match query.order {
        SortOrder::Asc => query.field.compare(a, b),
        SortOrder::Desc => query.field.compare(b, a),
    });

    display
}
