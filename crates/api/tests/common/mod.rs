#![allow(dead_code)]

use api::{build_app, init_domain_services};
use axum_test::{TestResponse, TestServer};
use config::{
    ApiConfig, DeploymentConfig, GitHubOAuthConfig, LoggingConfig, ServerConfig, SessionConfig,
};
use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::json;
use std::time::Duration;

pub const SESSION_COOKIE: &str = "deploy_session";
pub const TEST_CODE: &str = "good-code";
pub const TEST_TOKEN: &str = "gho_test_token";

/// Helper function to create a test configuration pointing every GitHub
/// endpoint at the mock server.
pub fn test_config(github: &MockServer) -> ApiConfig {
    ApiConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "compact".to_string(),
            modules: std::collections::HashMap::new(),
        },
        github: GitHubOAuthConfig {
            client_id: "test-client-id".to_string(),
            client_secret: Some("test-client-secret".to_string()),
            public_base_url: "http://localhost:3000".to_string(),
            backend_base_url: None,
            scopes: vec![
                "read:user".to_string(),
                "user:email".to_string(),
                "repo".to_string(),
            ],
            authorize_url: github.url("/login/oauth/authorize"),
            token_url: github.url("/login/oauth/access_token"),
            api_base_url: github.base_url(),
            repos_page_size: 50,
            http_timeout: Duration::from_secs(5),
        },
        session: SessionConfig {
            cookie_name: SESSION_COOKIE.to_string(),
            cookie_key: Some("k".repeat(64)),
            ttl: Duration::from_secs(3600),
            secure_cookies: false,
            state_ttl: Duration::from_secs(600),
            post_login_redirect: "/".to_string(),
        },
        deployment: DeploymentConfig {
            simulated_delay: Duration::ZERO,
        },
    }
}

pub fn setup_test_server(config: &ApiConfig) -> TestServer {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::level_filters::LevelFilter::DEBUG)
        .try_init();

    let domain_services = init_domain_services(config).unwrap();
    let app = build_app(config, domain_services).unwrap();
    TestServer::new(app).unwrap()
}

pub struct TestContext {
    pub server: TestServer,
    pub github: MockServer,
}

pub async fn setup() -> TestContext {
    let github = MockServer::start_async().await;
    let server = setup_test_server(&test_config(&github));
    TestContext { server, github }
}

/// `name=value` pair of the session cookie set by a response, ready for a `Cookie` header.
pub fn session_cookie(response: &TestResponse) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or_default().trim().to_string())
        .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE}=")))
}

pub fn location(response: &TestResponse) -> String {
    response
        .headers()
        .get("location")
        .expect("response has no Location header")
        .to_str()
        .unwrap()
        .to_string()
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    url::Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

pub async fn mock_token_exchange<'a>(github: &'a MockServer, code: &str, token: &str) -> Mock<'a> {
    let body = json!({"access_token": token, "token_type": "bearer", "scope": "repo"}).to_string();
    github
        .mock_async(|when, then| {
            when.method(POST)
                .path("/login/oauth/access_token")
                .body_contains(format!("code={code}"));
            then.status(200)
                .header("content-type", "application/json")
                .body(body);
        })
        .await
}

pub async fn mock_user<'a>(github: &'a MockServer, token: &str) -> Mock<'a> {
    github
        .mock_async(|when, then| {
            when.method(GET)
                .path("/user")
                .header("authorization", format!("Bearer {token}"));
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    json!({
                        "id": 583231,
                        "login": "octocat",
                        "name": "The Octocat",
                        "avatar_url": "https://avatars.githubusercontent.com/u/583231",
                        "email": "octocat@github.com"
                    })
                    .to_string(),
                );
        })
        .await
}

/// Start a sign-in and return the session cookie plus the state sent to GitHub.
pub async fn begin_login(server: &TestServer) -> (String, String) {
    let response = server.get("/auth/github/login").await;
    assert_eq!(response.status_code(), 303);

    let cookie = session_cookie(&response).expect("login must set the session cookie");
    let state = query_param(&location(&response), "state").expect("authorize URL carries state");
    (cookie, state)
}

/// Complete the whole sign-in flow against the GitHub mock and return the
/// session cookie issued by the callback.
pub async fn sign_in(ctx: &TestContext) -> String {
    mock_token_exchange(&ctx.github, TEST_CODE, TEST_TOKEN).await;
    mock_user(&ctx.github, TEST_TOKEN).await;

    let (cookie, state) = begin_login(&ctx.server).await;
    let response = ctx
        .server
        .get("/auth/callback")
        .add_query_param("code", TEST_CODE)
        .add_query_param("state", &state)
        .add_header("cookie", cookie)
        .await;
    assert_eq!(response.status_code(), 303, "callback failed: {}", response.text());

    session_cookie(&response).expect("callback must issue a new session cookie")
}
