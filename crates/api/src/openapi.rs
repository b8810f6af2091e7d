use crate::models::*;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Deploy Portal API",
        description = "Sign in with GitHub, browse your repositories and trigger deployments.\n\n## Authentication\n\nBrowser sessions are carried by an encrypted, HTTP-only session cookie set during `/auth/github/login`.",
        version = "1.0.0",
        license(
            name = "MIT",
        )
    ),
    paths(
        // Auth endpoints
        crate::routes::auth::github_login,
        crate::routes::auth::oauth_callback,
        crate::routes::auth::exchange_token,
        crate::routes::auth::current_user,
        crate::routes::auth::logout,
        crate::routes::auth::config_debug,
        // Repository endpoints
        crate::routes::repos::list_repositories,
        // Deployment endpoints
        crate::routes::deployments::list_targets,
        crate::routes::deployments::create_deployment,
        // Health
        crate::routes::health::health_check,
    ),
    components(
        schemas(
            ErrorResponse, ErrorDetail,
            TokenExchangeRequest, TokenExchangeResponse, SignOutResponse,
            DeploymentTargetInfo, CreateDeploymentRequest,
            services::auth::UserProfile,
            services::repositories::Repository,
            services::deployments::DeploymentTarget,
            services::deployments::DeploymentStatus,
            services::deployments::DeploymentReceipt,
            crate::routes::health::HealthResponse,
        ),
    )
)]
pub struct ApiDoc;

/// Security configuration for OpenAPI, applied at startup with the configured
/// session cookie name.
pub struct SecurityAddon {
    cookie_name: String,
}

impl SecurityAddon {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }
}

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(&self.cookie_name))),
            );
        }
    }
}

/// The served document, with the session cookie scheme named after `cookie_name`.
pub fn api_doc(cookie_name: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    SecurityAddon::new(cookie_name).modify(&mut doc);
    doc
}
