use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::{AuthError, UserProfile};
use crate::repositories::Repository;

#[derive(Deserialize)]
pub(crate) struct GitHubUser {
    pub id: u64,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<GitHubUser> for UserProfile {
    fn from(user: GitHubUser) -> Self {
        Self {
            id: user.id,
            login: user.login,
            display_name: user.name.filter(|name| !name.trim().is_empty()),
            avatar_url: user.avatar_url,
            email: user.email.filter(|email| !email.trim().is_empty()),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct GitHubEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

/// Picks the primary address, then any verified one, then the first listed.
pub(crate) fn preferred_email(emails: &[GitHubEmail]) -> Option<String> {
    emails
        .iter()
        .find(|e| e.primary)
        .or_else(|| emails.iter().find(|e| e.verified))
        .or_else(|| emails.first())
        .map(|e| e.email.clone())
}

#[derive(Deserialize)]
struct GitHubRepository {
    id: u64,
    name: String,
    full_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    updated_at: DateTime<Utc>,
    html_url: String,
    #[serde(default)]
    clone_url: Option<String>,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    private: bool,
}

impl From<GitHubRepository> for Repository {
    fn from(repo: GitHubRepository) -> Self {
        Self {
            id: repo.id,
            name: repo.name,
            full_name: repo.full_name,
            description: repo.description,
            primary_language: repo.language,
            star_count: repo.stargazers_count,
            updated_at: repo.updated_at,
            html_url: repo.html_url,
            clone_url: repo.clone_url,
            default_branch: repo.default_branch,
            is_private: repo.private,
        }
    }
}

/// Message GitHub puts in error bodies, e.g. `{"message": "Bad credentials"}`.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error_description"))
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Converts a `/user/repos` response body into repositories, rejecting anything
/// that is not an array of well-formed records.
pub(crate) fn parse_repository_page(body: Value) -> Result<Vec<Repository>, AuthError> {
    let items = match body {
        Value::Array(items) => items,
        other => {
            let detail = other
                .get("message")
                .and_then(Value::as_str)
                .map(|message| format!(": {message}"))
                .unwrap_or_default();
            return Err(AuthError::RepositoryFetchFailed(format!(
                "expected a list of repositories{detail}"
            )));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<GitHubRepository>(item)
                .map(Repository::from)
                .map_err(|e| {
                    AuthError::RepositoryFetchFailed(format!(
                        "malformed repository record at index {index}: {e}"
                    ))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repo_json(name: &str) -> Value {
        json!({
            "id": 7,
            "name": name,
            "full_name": format!("octocat/{name}"),
            "description": null,
            "language": "Rust",
            "stargazers_count": 3,
            "updated_at": "2024-05-01T12:00:00Z",
            "html_url": format!("https://github.com/octocat/{name}"),
            "clone_url": format!("https://github.com/octocat/{name}.git"),
            "default_branch": "main",
            "private": true
        })
    }

    #[test]
    fn test_repository_projection() {
        let repos = parse_repository_page(json!([repo_json("hello")])).unwrap();
        let repo = &repos[0];
        assert_eq!(repo.full_name, "octocat/hello");
        assert_eq!(repo.primary_language.as_deref(), Some("Rust"));
        assert_eq!(repo.star_count, 3);
        assert!(repo.is_private);
        assert_eq!(
            repo.clone_url.as_deref(),
            Some("https://github.com/octocat/hello.git")
        );
    }

    #[test]
    fn test_empty_array_is_empty_list() {
        assert!(parse_repository_page(json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_object_body_is_rejected_with_message() {
        let err = parse_repository_page(json!({"message": "Bad credentials"})).unwrap_err();
        match err {
            AuthError::RepositoryFetchFailed(msg) => assert!(msg.contains("Bad credentials")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_element_fails_whole_page() {
        let body = json!([repo_json("ok"), {"id": "not-a-number"}]);
        let err = parse_repository_page(body).unwrap_err();
        assert!(matches!(err, AuthError::RepositoryFetchFailed(msg) if msg.contains("index 1")));
    }

    #[test]
    fn test_preferred_email_order() {
        let emails = vec![
            GitHubEmail {
                email: "old@example.com".to_string(),
                primary: false,
                verified: false,
            },
            GitHubEmail {
                email: "verified@example.com".to_string(),
                primary: false,
                verified: true,
            },
        ];
        assert_eq!(
            preferred_email(&emails).as_deref(),
            Some("verified@example.com")
        );
        assert_eq!(preferred_email(&[]), None);
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"message":"Bad credentials"}"#).as_deref(),
            Some("Bad credentials")
        );
        assert_eq!(error_message("<html>"), None);
    }
}
