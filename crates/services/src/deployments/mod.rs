use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentTarget {
    Walrus,
    Oasis,
}

impl DeploymentTarget {
    pub const ALL: [DeploymentTarget; 2] = [DeploymentTarget::Walrus, DeploymentTarget::Oasis];

    pub fn id(&self) -> &'static str {
        match self {
            DeploymentTarget::Walrus => "walrus",
            DeploymentTarget::Oasis => "oasis",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DeploymentTarget::Walrus => "Walrus",
            DeploymentTarget::Oasis => "Oasis",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DeploymentTarget::Walrus => "Decentralized storage for static sites",
            DeploymentTarget::Oasis => "Confidential compute for backend services",
        }
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for DeploymentTarget {
    type Err = DeploymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeploymentTarget::ALL
            .into_iter()
            .find(|target| target.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DeploymentError::UnknownTarget(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Succeeded,
}

/// Outcome of a deployment request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentReceipt {
    pub id: Uuid,
    pub target: DeploymentTarget,
    pub repository: String,
    pub status: DeploymentStatus,
    pub message: String,
    pub requested_by: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error("Unknown deployment target: {0}")]
    UnknownTarget(String),

    #[error("Invalid repository name: {0:?} (expected owner/name)")]
    InvalidRepository(String),

    #[error("Not signed in")]
    Unauthorized,
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Checks `owner/name` shape and returns the repository name part.
fn repository_name(full_name: &str) -> Result<&str, DeploymentError> {
    match full_name.split_once('/') {
        Some((owner, name)) if valid_segment(owner) && valid_segment(name) => Ok(name),
        _ => Err(DeploymentError::InvalidRepository(full_name.to_string())),
    }
}

/// Simulated deployments: no artifact leaves the process.
pub struct DeploymentService {
    simulated_delay: Duration,
}

impl DeploymentService {
    pub fn new(simulated_delay: Duration) -> Self {
        Self { simulated_delay }
    }

    pub fn targets(&self) -> &'static [DeploymentTarget] {
        &DeploymentTarget::ALL
    }

    pub async fn deploy(
        &self,
        session: Option<&Session>,
        target: DeploymentTarget,
        repository: &str,
    ) -> Result<DeploymentReceipt, DeploymentError> {
        let session = session.ok_or(DeploymentError::Unauthorized)?;
        let repository = repository.trim();
        let name = repository_name(repository)?;

        tokio::time::sleep(self.simulated_delay).await;

        let receipt = DeploymentReceipt {
            id: Uuid::new_v4(),
            target,
            repository: repository.to_string(),
            status: DeploymentStatus::Succeeded,
            message: format!(
                "Successfully deployed {} using {}!",
                name,
                target.display_name().to_uppercase()
            ),
            requested_by: session.profile.login.clone(),
            completed_at: Utc::now(),
        };

        info!(
            deployment_id = %receipt.id,
            target = %target,
            repository = %receipt.repository,
            login = %receipt.requested_by,
            "Deployment completed"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessToken, UserProfile};

    fn session() -> Session {
        Session {
            access_token: AccessToken::new("gho_x"),
            profile: UserProfile {
                id: 1,
                login: "octocat".to_string(),
                display_name: None,
                avatar_url: None,
                email: None,
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_target_parsing() {
        assert_eq!("walrus".parse::<DeploymentTarget>().unwrap(), DeploymentTarget::Walrus);
        assert_eq!("Oasis".parse::<DeploymentTarget>().unwrap(), DeploymentTarget::Oasis);
        assert!(matches!(
            "heroku".parse::<DeploymentTarget>(),
            Err(DeploymentError::UnknownTarget(t)) if t == "heroku"
        ));
    }

    #[tokio::test]
    async fn test_deploy_reports_success_message() {
        let service = DeploymentService::new(Duration::ZERO);
        let session = session();

        let receipt = service
            .deploy(Some(&session), DeploymentTarget::Walrus, "octocat/hello-world")
            .await
            .unwrap();

        assert_eq!(receipt.status, DeploymentStatus::Succeeded);
        assert_eq!(receipt.message, "Successfully deployed hello-world using WALRUS!");
        assert_eq!(receipt.requested_by, "octocat");
    }

    #[tokio::test]
    async fn test_deploy_requires_session() {
        let service = DeploymentService::new(Duration::ZERO);
        let err = service
            .deploy(None, DeploymentTarget::Oasis, "octocat/hello")
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::Unauthorized));
    }

    #[tokio::test]
    async fn test_deploy_rejects_malformed_repository() {
        let service = DeploymentService::new(Duration::ZERO);
        let session = session();

        for bad in ["hello", "/hello", "octocat/", "a/b/c", "octo cat/x"] {
            let err = service
                .deploy(Some(&session), DeploymentTarget::Oasis, bad)
                .await
                .unwrap_err();
            assert!(matches!(err, DeploymentError::InvalidRepository(_)), "{bad}");
        }
    }
}
