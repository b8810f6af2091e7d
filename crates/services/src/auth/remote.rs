use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};
use url::Url;

use super::ports::{AccessToken, AuthError, AuthorizationCode, ExchangedIdentity, TokenExchanger};
use crate::github::GitHubClient;

const DEFAULT_FAILURE: &str = "Failed to exchange code for token";

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    code: &'a str,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    access_token: Option<String>,
}

/// Delegates the code exchange to a backend service that holds the client secret.
///
/// The backend is called with `POST {base}/auth/github` and a `{"code": ...}` body
/// and answers `{"access_token": ...}`.
pub struct RemoteTokenExchanger {
    http: reqwest::Client,
    exchange_url: Url,
    github: Arc<GitHubClient>,
}

impl RemoteTokenExchanger {
    pub fn new(
        backend_base_url: &str,
        timeout: Duration,
        github: Arc<GitHubClient>,
    ) -> Result<Self, AuthError> {
        let base = backend_base_url.trim_end_matches('/');
        let exchange_url = Url::parse(&format!("{base}/auth/github"))
            .map_err(|e| AuthError::InvalidConfig(format!("Invalid backend URL: {}", e)))?;

        // Redirects from the backend are never followed
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            exchange_url,
            github,
        })
    }
}

/// The backend reports `{"error": "..."}` or `{"error": {"message": "..."}}`.
fn backend_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .as_str()
        .or_else(|| error.get("message").and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl TokenExchanger for RemoteTokenExchanger {
    async fn exchange_code(
        &self,
        code: AuthorizationCode,
    ) -> Result<ExchangedIdentity, AuthError> {
        debug!(url = %self.exchange_url, "Delegating code exchange to backend");

        let response = self
            .http
            .post(self.exchange_url.clone())
            .json(&ExchangeRequest {
                code: code.secret(),
            })
            .send()
            .await
            .map_err(|e| AuthError::TokenRequestFailed(format!("backend request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AuthError::TokenRequestFailed(format!("Failed to read backend response: {}", e))
        })?;

        if !status.is_success() {
            let message =
                backend_error_message(&body).unwrap_or_else(|| DEFAULT_FAILURE.to_string());
            return Err(AuthError::TokenRequestFailed(message));
        }

        let access_token = serde_json::from_str::<ExchangeResponse>(&body)
            .ok()
            .and_then(|parsed| parsed.access_token)
            .map(AccessToken::new)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                AuthError::TokenRequestFailed(
                    "Backend response did not contain an access token".to_string(),
                )
            })?;

        let profile = self.github.fetch_user(&access_token).await?;

        info!("GitHub user authenticated via backend: {}", profile.login);
        Ok(ExchangedIdentity {
            access_token,
            profile,
        })
    }
}
