mod models;

pub(crate) use models::error_message;

use config::GitHubOAuthConfig;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{AccessToken, AuthError, UserProfile};
use crate::repositories::Repository;
use models::{parse_repository_page, preferred_email, GitHubEmail, GitHubUser};

const USER_AGENT: &str = concat!("deploy-portal/", env!("CARGO_PKG_VERSION"));
const GITHUB_JSON: &str = "application/vnd.github+json";

/// Thin client for the GitHub REST API, authenticated per call with a user token.
pub struct GitHubClient {
    http: Client,
    api_base: Url,
    repos_page_size: u32,
}

impl GitHubClient {
    pub fn new(config: &GitHubOAuthConfig) -> Result<Self, AuthError> {
        let mut api_base = Url::parse(&config.api_base_url).map_err(|e| {
            AuthError::InvalidConfig(format!("Invalid GitHub API base URL: {}", e))
        })?;
        // Url::join only keeps the last path segment when it ends with a slash
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AuthError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base,
            repos_page_size: config.repos_page_size,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.api_base
            .join(path)
            .map_err(|e| AuthError::InvalidConfig(format!("Invalid GitHub API path {path}: {e}")))
    }

    /// Fetch the profile of the token's owner, falling back to `/user/emails`
    /// when the account hides its email.
    pub async fn fetch_user(&self, token: &AccessToken) -> Result<UserProfile, AuthError> {
        let response = self
            .http
            .get(self.endpoint("user")?)
            .bearer_auth(token.secret())
            .header(header::ACCEPT, GITHUB_JSON)
            .send()
            .await
            .map_err(|e| AuthError::ProfileFetchFailed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_message(&body)
                .map(|message| format!(": {message}"))
                .unwrap_or_default();
            return Err(AuthError::ProfileFetchFailed(format!(
                "GitHub API returned status {status}{detail}"
            )));
        }

        let user: GitHubUser = response
            .json()
            .await
            .map_err(|e| AuthError::ProfileFetchFailed(format!("Failed to parse GitHub user: {}", e)))?;

        let mut profile = UserProfile::from(user);
        if profile.email.is_none() {
            profile.email = self.fetch_primary_email(token).await;
        }

        debug!(login = %profile.login, "Fetched GitHub profile");
        Ok(profile)
    }

    /// Best effort: a failure here leaves the profile without an email.
    async fn fetch_primary_email(&self, token: &AccessToken) -> Option<String> {
        let url = self.endpoint("user/emails").ok()?;
        let response = match self
            .http
            .get(url)
            .bearer_auth(token.secret())
            .header(header::ACCEPT, GITHUB_JSON)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(status = %response.status(), "GitHub emails endpoint unavailable");
                return None;
            }
            Err(e) => {
                warn!("Failed to fetch GitHub emails: {}", e);
                return None;
            }
        };

        match response.json::<Vec<GitHubEmail>>().await {
            Ok(emails) => preferred_email(&emails),
            Err(e) => {
                warn!("Failed to parse GitHub emails: {}", e);
                None
            }
        }
    }

    /// Repositories the token's owner can access, most recently updated first.
    pub async fn list_repositories(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<Repository>, AuthError> {
        let mut url = self.endpoint("user/repos")?;
        url.query_pairs_mut()
            .append_pair("sort", "updated")
            .append_pair("per_page", &self.repos_page_size.to_string());

        let response = self
            .http
            .get(url)
            .bearer_auth(token.secret())
            .header(header::ACCEPT, GITHUB_JSON)
            .send()
            .await
            .map_err(|e| AuthError::RepositoryFetchFailed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_message(&body)
                .map(|message| format!(": {message}"))
                .unwrap_or_default();
            return Err(AuthError::RepositoryFetchFailed(format!(
                "GitHub API returned status {status}{detail}"
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            AuthError::RepositoryFetchFailed(format!("response is not valid JSON: {}", e))
        })?;

        parse_repository_page(body)
    }
}
