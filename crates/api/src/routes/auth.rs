use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::PrivateCookieJar;
use config::ConfigStatus;
use services::auth::{CallbackQuery, SessionKey, UserProfile};
use tracing::{debug, info};

use crate::{
    middleware::{
        clear_session_cookie, ensure_session_key, session_key, set_session_key, MaybeSession,
    },
    models::{ErrorResponse, SignOutResponse, TokenExchangeRequest, TokenExchangeResponse},
    routes::common::{auth_error_response, ApiError},
    state::AppState,
};

/// Start GitHub sign-in
///
/// Issues (or reuses) the session cookie, records a fresh OAuth state and
/// redirects the browser to GitHub's authorization page.
#[utoipa::path(
    get,
    path = "/auth/github/login",
    tag = "Auth",
    responses(
        (status = 303, description = "Redirect to GitHub authorization page"),
        (status = 500, description = "OAuth is not configured", body = ErrorResponse)
    )
)]
pub async fn github_login(
    State(app_state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), ApiError> {
    let (jar, key) = ensure_session_key(jar, &app_state.cookies);
    let request = app_state
        .auth_service
        .begin_sign_in(&key)
        .await
        .map_err(auth_error_response)?;

    debug!(scopes = ?request.requested_scopes, "Redirecting to GitHub");
    Ok((jar, Redirect::to(&request.url)))
}

/// GitHub OAuth callback
///
/// Verifies the returned state against the one recorded at sign-in, exchanges
/// the code and establishes the session under a new session cookie.
#[utoipa::path(
    get,
    path = "/auth/callback",
    tag = "Auth",
    params(CallbackQuery),
    responses(
        (status = 303, description = "Signed in; sets a new session cookie and redirects to the application"),
        (status = 400, description = "Missing code or state mismatch", body = ErrorResponse),
        (status = 502, description = "GitHub rejected the exchange", body = ErrorResponse)
    )
)]
pub async fn oauth_callback(
    State(app_state): State<AppState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackQuery>,
) -> Response {
    // without a cookie there can be no pending state, so any code is rejected
    let key = session_key(&jar, &app_state.cookies).unwrap_or_else(SessionKey::generate);

    match app_state.auth_service.handle_callback(&key, params).await {
        Ok(established) => {
            info!(login = %established.session.profile.login, "Signed in");
            let jar = set_session_key(jar, &app_state.cookies, &established.key);
            (jar, Redirect::to(&app_state.cookies.post_login_redirect)).into_response()
        }
        Err(e) => auth_error_response(e).into_response(),
    }
}

/// Exchange an authorization code for an access token
///
/// For clients that handle the GitHub redirect themselves. No session is created.
#[utoipa::path(
    post,
    path = "/auth/github",
    tag = "Auth",
    request_body = TokenExchangeRequest,
    responses(
        (status = 200, description = "Access token", body = TokenExchangeResponse),
        (status = 400, description = "Missing code", body = ErrorResponse),
        (status = 502, description = "GitHub rejected the code", body = ErrorResponse)
    )
)]
pub async fn exchange_token(
    State(app_state): State<AppState>,
    Json(request): Json<TokenExchangeRequest>,
) -> Result<Json<TokenExchangeResponse>, ApiError> {
    let access_token = app_state
        .auth_service
        .exchange_code(request.code)
        .await
        .map_err(auth_error_response)?;

    Ok(Json(TokenExchangeResponse {
        access_token: access_token.secret().to_string(),
    }))
}

/// Current user
#[utoipa::path(
    get,
    path = "/auth/user",
    tag = "Auth",
    responses(
        (status = 200, description = "Signed-in GitHub profile", body = UserProfile),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    security(
        ("session_cookie" = [])
    )
)]
pub async fn current_user(
    MaybeSession(session): MaybeSession,
) -> Result<Json<UserProfile>, ApiError> {
    session
        .map(|session| Json(session.profile))
        .ok_or_else(|| auth_error_response(services::AuthError::Unauthorized))
}

/// Sign out
///
/// Clears the server-side session and the cookie. Signing out without a
/// session is not an error.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Signed out", body = SignOutResponse)
    )
)]
pub async fn logout(
    State(app_state): State<AppState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Json<SignOutResponse>) {
    if let Some(key) = session_key(&jar, &app_state.cookies) {
        app_state.auth_service.sign_out(&key).await;
    }

    (
        clear_session_cookie(jar, &app_state.cookies),
        Json(SignOutResponse {
            message: "Signed out".to_string(),
        }),
    )
}

/// Configuration diagnostics
///
/// Reports which settings are present. Values are never included.
#[utoipa::path(
    get,
    path = "/auth/debug",
    tag = "Auth",
    responses(
        (status = 200, description = "Presence of each configuration value")
    )
)]
pub async fn config_debug(State(app_state): State<AppState>) -> (StatusCode, Json<ConfigStatus>) {
    (StatusCode::OK, Json(app_state.config_status.as_ref().clone()))
}
