use async_trait::async_trait;
use config::GitHubOAuthConfig;
use oauth2::{
    basic::{BasicClient, BasicErrorResponse},
    AuthType, AuthUrl, ClientId, ClientSecret, CsrfToken, HttpClientError, RedirectUrl,
    RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::ports::{
    AccessToken, AuthError, AuthorizationCode, AuthorizationRequest, ExchangedIdentity,
    TokenExchanger,
};
use crate::github::GitHubClient;

// Type alias for a fully configured OAuth client
type ConfiguredClient = oauth2::Client<
    BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    oauth2::EndpointSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointSet,
>;

fn create_github_client(
    config: &GitHubOAuthConfig,
    client_secret: Option<&str>,
) -> Result<ConfiguredClient, AuthError> {
    if config.client_id.trim().is_empty() {
        return Err(AuthError::ConfigMissing(
            "GitHub client id is not configured".to_string(),
        ));
    }

    let auth_url = AuthUrl::new(config.authorize_url.clone())
        .map_err(|e| AuthError::InvalidConfig(format!("Invalid GitHub auth URL: {}", e)))?;

    let token_url = TokenUrl::new(config.token_url.clone())
        .map_err(|e| AuthError::InvalidConfig(format!("Invalid GitHub token URL: {}", e)))?;

    let redirect_url = RedirectUrl::new(config.redirect_uri())
        .map_err(|e| AuthError::InvalidConfig(format!("Invalid redirect URL: {}", e)))?;

    let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
        .set_auth_uri(auth_url)
        .set_token_uri(token_url)
        .set_redirect_uri(redirect_url)
        // GitHub expects the credentials in the form body
        .set_auth_type(AuthType::RequestBody);

    if let Some(secret) = client_secret {
        client = client.set_client_secret(ClientSecret::new(secret.to_string()));
    }

    Ok(client)
}

/// Builds the GitHub authorization URL for a new sign-in.
pub struct OAuthManager {
    client: ConfiguredClient,
    scopes: Vec<String>,
    redirect_uri: String,
}

impl OAuthManager {
    pub fn new(config: &GitHubOAuthConfig) -> Result<Self, AuthError> {
        Ok(Self {
            client: create_github_client(config, None)?,
            scopes: config.scopes.clone(),
            redirect_uri: config.redirect_uri(),
        })
    }

    /// Generate a GitHub authorization URL with a fresh random state.
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let (auth_url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .url();

        AuthorizationRequest {
            url: auth_url.to_string(),
            state: csrf_state.secret().to_string(),
            redirect_uri: self.redirect_uri.clone(),
            requested_scopes: self.scopes.clone(),
        }
    }
}

/// Error body GitHub returns from the token endpoint, sometimes with a 200 status.
#[derive(Deserialize)]
struct TokenErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

fn describe_token_error(
    err: RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>,
) -> String {
    match err {
        RequestTokenError::ServerResponse(response) => match response.error_description() {
            Some(description) => format!("{}: {}", response.error(), description),
            None => response.error().to_string(),
        },
        RequestTokenError::Request(e) => format!("request failed: {}", e),
        RequestTokenError::Parse(e, body) => {
            match serde_json::from_slice::<TokenErrorBody>(&body) {
                Ok(TokenErrorBody {
                    error: Some(error),
                    error_description,
                }) => match error_description {
                    Some(description) => format!("{}: {}", error, description),
                    None => error,
                },
                _ => format!("unexpected token response: {}", e),
            }
        }
        RequestTokenError::Other(message) => message,
    }
}

/// Exchanges codes directly with GitHub using the app's client secret.
pub struct GitHubTokenExchanger {
    client: ConfiguredClient,
    http: reqwest::Client,
    github: Arc<GitHubClient>,
}

impl GitHubTokenExchanger {
    pub fn new(
        config: &GitHubOAuthConfig,
        client_secret: &str,
        github: Arc<GitHubClient>,
    ) -> Result<Self, AuthError> {
        if client_secret.trim().is_empty() {
            return Err(AuthError::ConfigMissing(
                "GitHub client secret is not configured".to_string(),
            ));
        }

        // Redirects from the token endpoint are never followed
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AuthError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client: create_github_client(config, Some(client_secret))?,
            http,
            github,
        })
    }
}

#[async_trait]
impl TokenExchanger for GitHubTokenExchanger {
    async fn exchange_code(
        &self,
        code: AuthorizationCode,
    ) -> Result<ExchangedIdentity, AuthError> {
        debug!("Exchanging GitHub code for token");

        let token = self
            .client
            .exchange_code(oauth2::AuthorizationCode::new(code.into_secret()))
            .request_async(&self.http)
            .await
            .map_err(|e| AuthError::TokenRequestFailed(describe_token_error(e)))?;

        let access_token = AccessToken::new(token.access_token().secret().clone());
        if access_token.is_empty() {
            return Err(AuthError::TokenRequestFailed(
                "GitHub returned an empty access token".to_string(),
            ));
        }

        let profile = self.github.fetch_user(&access_token).await?;

        info!("GitHub user authenticated: {}", profile.login);
        Ok(ExchangedIdentity {
            access_token,
            profile,
        })
    }
}
