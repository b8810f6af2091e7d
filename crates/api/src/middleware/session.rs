use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::{
    cookie::{Cookie, Key, SameSite},
    PrivateCookieJar,
};
use services::{Session, SessionKey};
use std::convert::Infallible;

use crate::state::{AppState, CookieSettings};

/// Session cookie carrying the session key. No `Max-Age`: it lives for the
/// browser session while the server enforces its own TTL.
fn session_cookie(settings: &CookieSettings, key: &SessionKey) -> Cookie<'static> {
    Cookie::build((settings.name.clone(), key.to_string()))
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Read the session key from the jar. Missing, undecryptable or malformed
/// cookies all read as "no session".
pub fn session_key(jar: &PrivateCookieJar, settings: &CookieSettings) -> Option<SessionKey> {
    jar.get(&settings.name)
        .and_then(|cookie| cookie.value().parse().ok())
}

/// Reuse the browser's session key or mint one and set the cookie.
pub fn ensure_session_key(
    jar: PrivateCookieJar,
    settings: &CookieSettings,
) -> (PrivateCookieJar, SessionKey) {
    match session_key(&jar, settings) {
        Some(key) => (jar, key),
        None => {
            let key = SessionKey::generate();
            (set_session_key(jar, settings, &key), key)
        }
    }
}

/// Point the browser at a new session key, replacing any previous cookie.
pub fn set_session_key(
    jar: PrivateCookieJar,
    settings: &CookieSettings,
    key: &SessionKey,
) -> PrivateCookieJar {
    jar.add(session_cookie(settings, key))
}

pub fn clear_session_cookie(jar: PrivateCookieJar, settings: &CookieSettings) -> PrivateCookieJar {
    jar.remove(Cookie::build((settings.name.clone(), "")).path("/"))
}

/// The caller's session, if the cookie maps to a live one.
pub struct MaybeSession(pub Option<Session>);

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar<Key> = PrivateCookieJar::from_request_parts(parts, state).await?;
        let session = match session_key(&jar, &state.cookies) {
            Some(key) => state.auth_service.current_session(&key).await,
            None => None,
        };
        Ok(MaybeSession(session))
    }
}
