//! Job endpoints

use async_trait::async_trait;
use reqwest::Method;
use tracing::{info, instrument};

use super::ApiClient;
use crate::error::ClientError;
use crate::jobs::JobSource;
use crate::models::Job;

const JOBS_PATH: &str = "api/v1/jobs/";
const JOBS_SYNC_PATH: &str = "api/v1/jobs/sync";

impl ApiClient {
    /// `GET /api/v1/jobs/`: the server's current bounded snapshot of jobs.
    #[instrument(skip(self))]
    pub async fn list_jobs(&self) -> Result<Vec<Job>, ClientError> {
        let mut url = self.endpoint(JOBS_PATH)?;
        if let Some(limit) = self.jobs_limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }

        self.send_json(self.request(Method::GET, url), JOBS_PATH)
            .await
    }

    /// `GET /api/v1/jobs/{id}`
    #[instrument(skip(self))]
    pub async fn get_job(&self, job_id: i64) -> Result<Job, ClientError> {
        let path = format!("{JOBS_PATH}{job_id}");
        let url = self.endpoint(&path)?;
        self.send_json(self.request(Method::GET, url), &path).await
    }

    /// `POST /api/v1/jobs/sync`: ask the server to synchronize job state.
    #[instrument(skip(self))]
    pub async fn sync_jobs(&self) -> Result<(), ClientError> {
        let url = self.endpoint(JOBS_SYNC_PATH)?;
        self.send_unit(self.request(Method::POST, url), JOBS_SYNC_PATH)
            .await?;
        info!("Job synchronization triggered");
        Ok(())
    }
}

#[async_trait]
impl JobSource for ApiClient {
    async fn fetch_jobs(&self) -> Result<Vec<Job>, ClientError> {
        self.list_jobs().await
    }

    async fn trigger_sync(&self) -> Result<(), ClientError> {
        self.sync_jobs().await
    }
}
