pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::Key;
use config::{ApiConfig, LoggingConfig, SessionConfig, TokenExchangeMode};
use services::{
    auth::{
        AuthError, AuthService, GitHubTokenExchanger, InMemorySessionStore, OAuthManager,
        RemoteTokenExchanger, SessionStore, TokenExchanger,
    },
    DeploymentService, GitHubClient, RepositoryLister,
};
use std::{sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;

use crate::{
    openapi::api_doc,
    routes::{
        auth::{config_debug, current_user, exchange_token, github_login, logout, oauth_callback},
        deployments::{create_deployment, list_targets},
        health::health_check,
        repos::list_repositories,
    },
    state::{AppState, CookieSettings},
};

/// Services the router depends on, built once at startup.
#[derive(Clone)]
pub struct DomainServices {
    pub auth_service: Arc<AuthService>,
    pub session_store: Arc<dyn SessionStore>,
    pub repository_lister: Arc<RepositoryLister>,
    pub deployment_service: Arc<DeploymentService>,
}

/// Wire the GitHub client, token exchanger and session store from configuration.
pub fn init_domain_services(config: &ApiConfig) -> Result<DomainServices, AuthError> {
    let github = Arc::new(GitHubClient::new(&config.github)?);
    let oauth = OAuthManager::new(&config.github)?;

    let exchanger: Arc<dyn TokenExchanger> = match config.github.exchange_mode() {
        TokenExchangeMode::Direct { client_secret } => {
            tracing::info!("Exchanging OAuth codes directly with GitHub");
            Arc::new(GitHubTokenExchanger::new(
                &config.github,
                client_secret,
                github.clone(),
            )?)
        }
        TokenExchangeMode::Backend { base_url } => {
            tracing::info!(backend = %base_url, "Delegating OAuth code exchange to backend");
            Arc::new(RemoteTokenExchanger::new(
                base_url,
                config.github.http_timeout,
                github.clone(),
            )?)
        }
    };

    let session_store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(
        config.session.ttl,
        config.session.state_ttl,
    ));

    Ok(DomainServices {
        auth_service: Arc::new(AuthService::new(oauth, exchanger, session_store.clone())),
        session_store,
        repository_lister: Arc::new(RepositoryLister::new(github)),
        deployment_service: Arc::new(DeploymentService::new(
            config.deployment.simulated_delay,
        )),
    })
}

fn cookie_settings(config: &SessionConfig) -> Result<CookieSettings, AuthError> {
    let key = match &config.cookie_key {
        Some(raw) => Key::try_from(raw.as_bytes()).map_err(|_| {
            AuthError::InvalidConfig(
                "SESSION_COOKIE_KEY must be at least 64 bytes".to_string(),
            )
        })?,
        None => {
            tracing::warn!(
                "SESSION_COOKIE_KEY not set; using an ephemeral key, sessions will not survive a restart"
            );
            Key::generate()
        }
    };

    Ok(CookieSettings {
        key,
        name: config.cookie_name.clone(),
        secure: config.secure_cookies,
        post_login_redirect: config.post_login_redirect.clone(),
    })
}

/// Build the complete application router
pub fn build_app(config: &ApiConfig, domain_services: DomainServices) -> Result<Router, AuthError> {
    let app_state = AppState {
        auth_service: domain_services.auth_service,
        repository_lister: domain_services.repository_lister,
        deployment_service: domain_services.deployment_service,
        cookies: cookie_settings(&config.session)?,
        config_status: Arc::new(config.status()),
    };

    Ok(Router::new()
        .nest("/auth", build_auth_routes())
        .nest("/v1", build_v1_routes())
        .with_state(app_state)
        .merge(build_openapi_routes(&config.session.cookie_name))
        .layer(TraceLayer::new_for_http()))
}

pub fn build_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/github/login", get(github_login))
        .route("/github", post(exchange_token))
        .route("/callback", get(oauth_callback))
        .route("/user", get(current_user))
        .route("/logout", post(logout))
        .route("/debug", get(config_debug))
}

pub fn build_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/repos", get(list_repositories))
        .route("/deployments/targets", get(list_targets))
        .route("/deployments", post(create_deployment))
        .route("/health", get(health_check))
}

/// Build OpenAPI documentation routes
pub fn build_openapi_routes(cookie_name: &str) -> Router {
    let doc = api_doc(cookie_name);
    Router::new().route(
        "/api-docs/openapi.json",
        get(move || {
            let doc = doc.clone();
            async move { axum::Json(doc) }
        }),
    )
}

/// Periodically drop expired sessions and OAuth states.
pub fn spawn_session_cleanup(
    store: Arc<dyn SessionStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = store.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "Purged expired sessions");
            }
        }
    })
}

pub fn init_tracing(logging_config: &LoggingConfig) {
    let filter = logging_config.filter_directive();

    match logging_config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .init();
        }
    }
}
