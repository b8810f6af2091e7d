use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use crate::auth::{AuthError, Session};
use crate::github::GitHubClient;

/// A repository as shown in the picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: u64,
    pub name: String,
    /// `owner/name`
    pub full_name: String,
    pub description: Option<String>,
    pub primary_language: Option<String>,
    pub star_count: u64,
    pub updated_at: DateTime<Utc>,
    pub html_url: String,
    pub clone_url: Option<String>,
    pub default_branch: Option<String>,
    pub is_private: bool,
}

pub struct RepositoryLister {
    github: Arc<GitHubClient>,
}

impl RepositoryLister {
    pub fn new(github: Arc<GitHubClient>) -> Self {
        Self { github }
    }

    /// List repositories for the signed-in user. No request leaves the process
    /// without a session carrying a token.
    pub async fn list_repositories(
        &self,
        session: Option<&Session>,
    ) -> Result<Vec<Repository>, AuthError> {
        let session = session.ok_or(AuthError::Unauthorized)?;
        if session.access_token.is_empty() {
            return Err(AuthError::Unauthorized);
        }

        let repositories = self.github.list_repositories(&session.access_token).await?;
        debug!(
            login = %session.profile.login,
            count = repositories.len(),
            "Listed repositories"
        );
        Ok(repositories)
    }
}
