pub mod oauth;
pub mod ports;
pub mod remote;
pub mod session;

pub use oauth::{GitHubTokenExchanger, OAuthManager};
pub use ports::*;
pub use remote::RemoteTokenExchanger;
pub use session::InMemorySessionStore;

use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Coordinates the GitHub sign-in flow for one browser session at a time.
pub struct AuthService {
    oauth: OAuthManager,
    exchanger: Arc<dyn TokenExchanger>,
    sessions: Arc<dyn SessionStore>,
}

impl AuthService {
    pub fn new(
        oauth: OAuthManager,
        exchanger: Arc<dyn TokenExchanger>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            oauth,
            exchanger,
            sessions,
        }
    }

    pub fn sessions(&self) -> Arc<dyn SessionStore> {
        self.sessions.clone()
    }

    /// Start a sign-in. The state is persisted before the URL is handed out,
    /// replacing any earlier pending state for this session.
    pub async fn begin_sign_in(&self, key: &SessionKey) -> Result<AuthorizationRequest, AuthError> {
        let request = self.oauth.authorization_request();
        self.sessions
            .save_pending_state(key, request.state.clone())
            .await;

        debug!(redirect_uri = %request.redirect_uri, "Issued GitHub authorization request");
        Ok(request)
    }

    /// Complete a sign-in from the callback query.
    ///
    /// The pending state is consumed whether or not the exchange succeeds, so a
    /// callback URL can be used at most once. On success the session is stored
    /// under a new key and everything held for `key` is dropped.
    pub async fn handle_callback(
        &self,
        key: &SessionKey,
        query: CallbackQuery,
    ) -> Result<EstablishedSession, AuthError> {
        if let Some(provider_error) = query.error {
            // only a callback carrying the pending state may cancel the sign-in
            let returned_state = query.state.unwrap_or_default();
            if !self.sessions.take_matching_state(key, &returned_state).await {
                warn!("OAuth state mismatch on provider error");
                return Err(AuthError::StateMismatch);
            }
            let description = query.error_description.unwrap_or(provider_error);
            warn!(description = %description, "GitHub returned an authorization error");
            return Err(AuthError::TokenRequestFailed(description));
        }

        let code = query
            .code
            .filter(|code| !code.is_empty())
            .ok_or(AuthError::MissingCode)?;

        let returned_state = query.state.unwrap_or_default();
        match self.sessions.take_pending_state(key).await {
            Some(expected) if states_match(&expected, &returned_state) => {}
            _ => {
                warn!("OAuth state mismatch");
                return Err(AuthError::StateMismatch);
            }
        }

        let identity = self
            .exchanger
            .exchange_code(AuthorizationCode::new(code))
            .await
            .map_err(|e| {
                error!(error = %e, "Token exchange failed");
                AuthError::ExchangeFailed(Box::new(e))
            })?;

        let fresh_key = SessionKey::generate();
        let session = self
            .sessions
            .save(&fresh_key, identity.access_token, identity.profile)
            .await;
        self.sessions.clear(key).await;

        info!(login = %session.profile.login, "GitHub sign-in completed");
        Ok(EstablishedSession {
            key: fresh_key,
            session,
        })
    }

    /// Exchange a code without any session bookkeeping, for clients that run
    /// the redirect themselves and only need the token.
    pub async fn exchange_code(&self, code: Option<String>) -> Result<AccessToken, AuthError> {
        let code = code
            .filter(|code| !code.trim().is_empty())
            .ok_or(AuthError::MissingCode)?;

        let identity = self
            .exchanger
            .exchange_code(AuthorizationCode::new(code))
            .await?;

        Ok(identity.access_token)
    }

    pub async fn current_session(&self, key: &SessionKey) -> Option<Session> {
        self.sessions.load(key).await
    }

    pub async fn sign_out(&self, key: &SessionKey) {
        self.sessions.clear(key).await;
        debug!("Session cleared");
    }
}
