//! Detail-view selection state.
//!
//! A selection holds a snapshot of the job as it looked when it was picked.
//! Later polls do not touch it: re-selecting the row is the only way to see
//! fresher fields.

use crate::models::Job;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selection {
    #[default]
    NoSelection,
    Viewing(Box<Job>),
}

impl Selection {
    /// Open (or replace) the detail view with a snapshot of `job`.
    pub fn select(&mut self, job: &Job) {
        *self = Selection::Viewing(Box::new(job.clone()));
    }

    /// Close the detail view.
    pub fn dismiss(&mut self) {
        *self = Selection::NoSelection;
    }

    pub fn current(&self) -> Option<&Job> {
        match self {
            Selection::NoSelection => None,
            Selection::Viewing(job) => Some(&**job),
        }
    }

    pub fn is_viewing(&self) -> bool {
        matches!(self, Selection::Viewing(_))
    }
}
