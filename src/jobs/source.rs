//! Seam between the poller and whatever serves job snapshots.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::models::Job;

/// Source of job snapshots for the monitor.
#[async_trait]
pub trait JobSource: Send + Sync + 'static {
    /// Fetch the complete current collection. Each call replaces the previous one wholesale.
    async fn fetch_jobs(&self) -> Result<Vec<Job>, ClientError>;

    /// Ask the server to synchronize job state.
    async fn trigger_sync(&self) -> Result<(), ClientError>;
}
