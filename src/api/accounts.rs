//! Connected account endpoints

use reqwest::Method;
use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use super::ApiClient;
use crate::error::ClientError;
use crate::models::{AuthorizationLink, ConnectedAccount, NewAccount};

const ACCOUNTS_PATH: &str = "api/v1/connected-accounts/";

/// Messages pulled per manual import unless the caller says otherwise.
pub const DEFAULT_IMPORT_LIMIT: u32 = 10;

impl ApiClient {
    #[instrument(skip(self))]
    pub async fn list_accounts(&self) -> Result<Vec<ConnectedAccount>, ClientError> {
        let url = self.endpoint(ACCOUNTS_PATH)?;
        self.send_json(self.request(Method::GET, url), ACCOUNTS_PATH)
            .await
    }

    /// Link a new mailbox. The account starts unauthorized until its OAuth flow completes.
    #[instrument(skip(self))]
    pub async fn create_account(
        &self,
        provider: &str,
        email: &str,
    ) -> Result<ConnectedAccount, ClientError> {
        let url = self.endpoint(ACCOUNTS_PATH)?;
        let body = NewAccount {
            provider: provider.trim().to_lowercase(),
            email: email.trim().to_string(),
        };
        let account: ConnectedAccount = self
            .send_json(self.request(Method::POST, url).json(&body), ACCOUNTS_PATH)
            .await?;
        info!(account_id = account.id, provider = %account.provider, "Account connected");
        Ok(account)
    }

    #[instrument(skip(self))]
    pub async fn delete_account(&self, account_id: i64) -> Result<(), ClientError> {
        let path = format!("{ACCOUNTS_PATH}{account_id}");
        let url = self.endpoint(&path)?;
        self.send_unit(self.request(Method::DELETE, url), &path)
            .await?;
        info!(account_id, "Account disconnected");
        Ok(())
    }

    /// Fetch the provider consent URL. Only OAuth-capable providers are asked.
    #[instrument(skip(self, account), fields(account_id = account.id))]
    pub async fn authorize_account(
        &self,
        account: &ConnectedAccount,
    ) -> Result<AuthorizationLink, ClientError> {
        if !account.supports_oauth() {
            return Err(ClientError::Unsupported {
                provider: account.provider.clone(),
                operation: "authorization".to_string(),
            });
        }

        let path = format!("{ACCOUNTS_PATH}{}/authorize", account.id);
        let url = self.endpoint(&path)?;
        self.send_json(self.request(Method::GET, url), &path).await
    }

    /// Trigger a batch fetch of the latest messages for an account.
    #[instrument(skip(self))]
    pub async fn import_account(
        &self,
        account_id: i64,
        limit: u32,
    ) -> Result<JsonValue, ClientError> {
        let path = format!("{ACCOUNTS_PATH}{account_id}/fetch");
        let mut url = self.endpoint(&path)?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());

        let body = self.send_checked(self.request(Method::POST, url), &path).await?;
        if body.is_empty() {
            return Ok(JsonValue::Null);
        }
        serde_json::from_slice(&body).map_err(|err| ClientError::malformed(path, err))
    }
}
