//! # Dashboard API client
//!
//! Thin typed wrapper over the dashboard's REST endpoints. One
//! [`reqwest::Client`] is shared by every call; the bearer token comes from an
//! injected [`TokenProvider`] so no call site reads ambient session state.

pub mod accounts;
pub mod emails;
pub mod jobs;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::TokenProvider;
use crate::config::AppConfig;
use crate::error::ClientError;

const USER_AGENT: &str = concat!("jobwatch/", env!("CARGO_PKG_VERSION"));

/// Client for the dashboard REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
    jobs_limit: Option<u32>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("jobs_limit", &self.jobs_limit)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client rooted at `base_url`. A path prefix on the base is preserved.
    pub fn new(
        mut base_url: Url,
        tokens: Arc<dyn TokenProvider>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            tokens,
            jobs_limit: None,
        })
    }

    /// Build a client from loaded configuration.
    pub fn from_config(
        config: &AppConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, ClientError> {
        let base_url = config.base_url()?;
        Ok(Self::new(base_url, tokens, config.request_timeout())?
            .with_jobs_limit(config.polling.jobs_limit))
    }

    /// Send `limit` on job listings.
    pub fn with_jobs_limit(mut self, limit: Option<u32>) -> Self {
        self.jobs_limit = limit;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an API path (relative, no leading slash) against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.tokens.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and decode a JSON body. Shape mismatches become `Malformed`.
    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, ClientError> {
        let body = self.send_checked(builder, endpoint).await?;
        serde_json::from_slice(&body).map_err(|err| ClientError::malformed(endpoint, err))
    }

    /// Send a request whose successful body is not needed.
    async fn send_unit(&self, builder: RequestBuilder, endpoint: &str) -> Result<(), ClientError> {
        self.send_checked(builder, endpoint).await.map(|_| ())
    }

    async fn send_checked(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
    ) -> Result<Vec<u8>, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(endpoint, status = status.as_u16(), bytes = body.len(), "API response");

        if !status.is_success() {
            return Err(ClientError::from_status(status, &body));
        }
        Ok(body.to_vec())
    }
}
