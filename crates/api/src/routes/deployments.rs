use axum::{extract::State, Json};
use services::deployments::{DeploymentError, DeploymentReceipt, DeploymentTarget};

use crate::{
    middleware::MaybeSession,
    models::{CreateDeploymentRequest, DeploymentTargetInfo, ErrorResponse},
    routes::common::{deployment_error_response, ApiError},
    state::AppState,
};

/// List deployment targets
#[utoipa::path(
    get,
    path = "/v1/deployments/targets",
    tag = "Deployments",
    responses(
        (status = 200, description = "Available targets", body = Vec<DeploymentTargetInfo>)
    )
)]
pub async fn list_targets(State(app_state): State<AppState>) -> Json<Vec<DeploymentTargetInfo>> {
    Json(
        app_state
            .deployment_service
            .targets()
            .iter()
            .copied()
            .map(DeploymentTargetInfo::from)
            .collect(),
    )
}

/// Deploy a repository
///
/// Simulated: waits for the configured delay and reports success.
#[utoipa::path(
    post,
    path = "/v1/deployments",
    tag = "Deployments",
    request_body = CreateDeploymentRequest,
    responses(
        (status = 200, description = "Deployment finished", body = DeploymentReceipt),
        (status = 400, description = "Unknown target or malformed repository", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    security(
        ("session_cookie" = [])
    )
)]
pub async fn create_deployment(
    State(app_state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Json(request): Json<CreateDeploymentRequest>,
) -> Result<Json<DeploymentReceipt>, ApiError> {
    let session = session.ok_or_else(|| deployment_error_response(DeploymentError::Unauthorized))?;
    let target: DeploymentTarget = request.target.parse().map_err(deployment_error_response)?;

    app_state
        .deployment_service
        .deploy(Some(&session), target, &request.repository)
        .await
        .map(Json)
        .map_err(deployment_error_response)
}
