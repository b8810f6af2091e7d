use axum::{http::StatusCode, Json};
use services::{AuthError, DeploymentError};

use crate::models::ErrorResponse;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map auth errors to HTTP status codes
pub fn map_auth_error_to_status(error: &AuthError) -> StatusCode {
    match error {
        AuthError::MissingCode | AuthError::StateMismatch => StatusCode::BAD_REQUEST,
        AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
        AuthError::TokenRequestFailed(_)
        | AuthError::ExchangeFailed(_)
        | AuthError::ProfileFetchFailed(_)
        | AuthError::RepositoryFetchFailed(_) => StatusCode::BAD_GATEWAY,
        AuthError::ConfigMissing(_) | AuthError::InvalidConfig(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn auth_error_response(error: AuthError) -> ApiError {
    let status = map_auth_error_to_status(&error);
    if status.is_server_error() {
        tracing::error!(error = %error, "Request failed");
    } else {
        tracing::debug!(error = %error, "Request rejected");
    }
    (
        status,
        Json(ErrorResponse::new(error.to_string(), error.kind().to_string())),
    )
}

pub fn deployment_error_response(error: DeploymentError) -> ApiError {
    let (status, kind, param) = match &error {
        DeploymentError::UnknownTarget(_) => (StatusCode::BAD_REQUEST, "unknown_target", "target"),
        DeploymentError::InvalidRepository(_) => {
            (StatusCode::BAD_REQUEST, "invalid_repository", "repository")
        }
        DeploymentError::Unauthorized => {
            return auth_error_response(AuthError::Unauthorized);
        }
    };
    (
        status,
        Json(ErrorResponse::with_param(
            error.to_string(),
            kind.to_string(),
            param.to_string(),
        )),
    )
}
