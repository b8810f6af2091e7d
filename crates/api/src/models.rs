use serde::{Deserialize, Serialize};
use services::deployments::DeploymentTarget;
use utoipa::ToSchema;

// ============================================
// Errors
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: String, error_type: String) -> Self {
        Self {
            error: ErrorDetail {
                message,
                r#type: error_type,
                param: None,
                code: None,
            },
        }
    }

    pub fn with_param(message: String, error_type: String, param: String) -> Self {
        Self {
            error: ErrorDetail {
                message,
                r#type: error_type,
                param: Some(param),
                code: None,
            },
        }
    }
}

// ============================================
// Auth
// ============================================

/// Body of `POST /auth/github`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenExchangeRequest {
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenExchangeResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignOutResponse {
    pub message: String,
}

// ============================================
// Deployments
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentTargetInfo {
    pub id: DeploymentTarget,
    pub name: String,
    pub description: String,
}

impl From<DeploymentTarget> for DeploymentTargetInfo {
    fn from(target: DeploymentTarget) -> Self {
        Self {
            id: target,
            name: target.display_name().to_string(),
            description: target.description().to_string(),
        }
    }
}

/// Body of `POST /v1/deployments`. The target stays a string so unknown
/// values produce a descriptive 400 instead of a deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateDeploymentRequest {
    pub target: String,
    /// `owner/name`
    pub repository: String,
}
