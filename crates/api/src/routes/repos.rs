use axum::{extract::State, Json};
use services::Repository;

use crate::{
    middleware::MaybeSession,
    models::ErrorResponse,
    routes::common::{auth_error_response, ApiError},
    state::AppState,
};

/// List repositories
///
/// Repositories of the signed-in user, most recently updated first.
#[utoipa::path(
    get,
    path = "/v1/repos",
    tag = "Repositories",
    responses(
        (status = 200, description = "Repositories", body = Vec<Repository>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 502, description = "GitHub request failed", body = ErrorResponse)
    ),
    security(
        ("session_cookie" = [])
    )
)]
pub async fn list_repositories(
    State(app_state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Result<Json<Vec<Repository>>, ApiError> {
    app_state
        .repository_lister
        .list_repositories(session.as_ref())
        .await
        .map(Json)
        .map_err(auth_error_response)
}
