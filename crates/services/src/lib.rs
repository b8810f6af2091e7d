pub mod auth;
pub mod deployments;
pub mod github;
pub mod repositories;

pub use auth::{AuthError, AuthService, Session, SessionKey};
pub use deployments::{DeploymentError, DeploymentService, DeploymentTarget};
pub use github::GitHubClient;
pub use repositories::{Repository, RepositoryLister};
