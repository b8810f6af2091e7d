use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use subtle::ConstantTimeEq;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;

/// Opaque identifier tying a browser to its server-side session record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SessionKey(pub Uuid);

impl SessionKey {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for SessionKey {
    fn from(uuid: Uuid) -> Self {
        SessionKey(uuid)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(SessionKey)
    }
}

/// Single-use code GitHub hands back on the callback.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    pub fn into_secret(self) -> String {
        self.0
    }
}

impl fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthorizationCode(<redacted>)")
    }
}

/// Bearer credential for the GitHub API. Never logged.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Identity of the signed-in GitHub account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: u64,
    pub login: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
}

/// An authenticated browser session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: AccessToken,
    pub profile: UserProfile,
    pub created_at: DateTime<Utc>,
}

/// A session established by a completed sign-in, stored under a freshly
/// minted key that replaces the one used while signing in.
#[derive(Debug, Clone, PartialEq)]
pub struct EstablishedSession {
    pub key: SessionKey,
    pub session: Session,
}

/// Constant-time comparison of the stored and returned OAuth state.
pub fn states_match(expected: &str, returned: &str) -> bool {
    expected.as_bytes().ct_eq(returned.as_bytes()).into()
}

/// Result of a successful code exchange.
#[derive(Debug, Clone)]
pub struct ExchangedIdentity {
    pub access_token: AccessToken,
    pub profile: UserProfile,
}

/// Where to send the browser to start sign-in.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub redirect_uri: String,
    pub requested_scopes: Vec<String>,
}

/// Query parameters GitHub appends to the callback URL.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user denied access or GitHub rejected the request.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// Error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization code is missing from the callback")]
    MissingCode,

    #[error("OAuth state parameter does not match the pending sign-in")]
    StateMismatch,

    #[error("Token request failed: {0}")]
    TokenRequestFailed(String),

    #[error("Failed to exchange code for token: {0}")]
    ExchangeFailed(Box<AuthError>),

    #[error("Failed to fetch GitHub profile: {0}")]
    ProfileFetchFailed(String),

    #[error("Failed to fetch repositories: {0}")]
    RepositoryFetchFailed(String),

    #[error("Not signed in")]
    Unauthorized,

    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AuthError {
    /// Stable machine-readable name, used as the `type` of API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCode => "missing_code",
            AuthError::StateMismatch => "state_mismatch",
            AuthError::TokenRequestFailed(_) => "token_request_failed",
            AuthError::ExchangeFailed(_) => "exchange_failed",
            AuthError::ProfileFetchFailed(_) => "profile_fetch_failed",
            AuthError::RepositoryFetchFailed(_) => "repository_fetch_failed",
            AuthError::Unauthorized => "unauthorized",
            AuthError::ConfigMissing(_) => "config_missing",
            AuthError::InvalidConfig(_) => "invalid_config",
        }
    }
}

// Repository traits

/// Turns an authorization code into an access token plus the profile it belongs to.
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange_code(&self, code: AuthorizationCode)
        -> Result<ExchangedIdentity, AuthError>;
}

/// Server-side storage for pending OAuth state and established sessions.
///
/// Every operation is atomic per key: a pending state can be taken at most once.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_pending_state(&self, key: &SessionKey, state: String);

    /// Remove and return the pending state if it exists and has not expired.
    async fn take_pending_state(&self, key: &SessionKey) -> Option<String>;

    /// Remove the pending state only if it is live and equals `returned`.
    /// A mismatch leaves it in place.
    async fn take_matching_state(&self, key: &SessionKey, returned: &str) -> bool;

    async fn save(&self, key: &SessionKey, access_token: AccessToken, profile: UserProfile)
        -> Session;

    async fn load(&self, key: &SessionKey) -> Option<Session>;

    /// Drop everything held for the key: pending state, token and profile.
    async fn clear(&self, key: &SessionKey);

    /// Remove expired records, returning how many were dropped.
    async fn purge_expired(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_are_redacted_in_debug_output() {
        let token = AccessToken::new("gho_secret");
        let code = AuthorizationCode::new("code-123");
        assert!(!format!("{token:?}").contains("gho_secret"));
        assert!(!format!("{code:?}").contains("code-123"));
    }

    #[test]
    fn test_session_key_round_trips_through_string() {
        let key = SessionKey::generate();
        let parsed: SessionKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
        assert!("not-a-uuid".parse::<SessionKey>().is_err());
    }

    #[test]
    fn test_state_comparison() {
        assert!(states_match("abc", "abc"));
        assert!(!states_match("abc", "abd"));
        assert!(!states_match("abc", ""));
    }

    #[test]
    fn test_blank_access_token_is_empty() {
        assert!(AccessToken::new("  ").is_empty());
        assert!(!AccessToken::new("gho_x").is_empty());
    }
}
