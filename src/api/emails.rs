//! Email endpoints

use reqwest::Method;
use tracing::instrument;

use super::ApiClient;
use crate::error::ClientError;
use crate::models::EmailRecord;

const EMAILS_PATH: &str = "api/v1/emails/";

impl ApiClient {
    #[instrument(skip(self))]
    pub async fn list_emails(&self) -> Result<Vec<EmailRecord>, ClientError> {
        let url = self.endpoint(EMAILS_PATH)?;
        self.send_json(self.request(Method::GET, url), EMAILS_PATH)
            .await
    }
}
