//! Login and registration endpoints
//!
//! These are the only calls that run before a token exists; they never attach
//! the bearer header.

use reqwest::Method;
use tracing::{info, instrument};

use super::ApiClient;
use crate::error::ClientError;
use crate::models::{LoginResponse, RegisterRequest, UserProfile};

const LOGIN_PATH: &str = "api/auth/login";
const REGISTER_PATH: &str = "api/auth/register";

impl ApiClient {
    /// `POST /api/auth/login` with form fields `username` (username or email) and `password`.
    #[instrument(skip(self, password))]
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let url = self.endpoint(LOGIN_PATH)?;
        let form = [("username", identifier), ("password", password)];
        let response: LoginResponse = self
            .send_json(self.http.request(Method::POST, url).form(&form), LOGIN_PATH)
            .await?;
        info!(
            user = response.user.as_ref().map(|u| u.username.as_str()).unwrap_or("unknown"),
            "Login succeeded"
        );
        Ok(response)
    }

    /// `POST /api/auth/register`
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ClientError> {
        let url = self.endpoint(REGISTER_PATH)?;
        self.send_json(
            self.http.request(Method::POST, url).json(request),
            REGISTER_PATH,
        )
        .await
    }
}
