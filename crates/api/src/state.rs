use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use config::ConfigStatus;
use services::{AuthService, DeploymentService, RepositoryLister};
use std::sync::Arc;

/// Settings for the encrypted browser session cookie.
#[derive(Clone)]
pub struct CookieSettings {
    pub key: Key,
    pub name: String,
    pub secure: bool,
    pub post_login_redirect: String,
}

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub repository_lister: Arc<RepositoryLister>,
    pub deployment_service: Arc<DeploymentService>,
    pub cookies: CookieSettings,
    pub config_status: Arc<ConfigStatus>,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookies.key.clone()
    }
}
