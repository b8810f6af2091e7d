use std::{collections::HashMap, fmt, time::Duration};

use serde::Serialize;

use crate::{optional, parsed_or, required, ConfigError, Lookup, ProcessEnv};

pub const DEFAULT_GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
pub const DEFAULT_GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const DEFAULT_GITHUB_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_SCOPES: [&str; 3] = ["read:user", "user:email", "repo"];
pub const DEFAULT_REPOS_PAGE_SIZE: u32 = 50;
pub const MAX_REPOS_PAGE_SIZE: u32 = 100;
/// Minimum length `axum_extra`'s cookie `Key` accepts as master key material.
pub const MIN_COOKIE_KEY_BYTES: usize = 64;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub github: GitHubOAuthConfig,
    pub session: SessionConfig,
    pub deployment: DeploymentConfig,
}

impl ApiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&ProcessEnv)
    }

    /// Load configuration from an arbitrary key/value source.
    pub fn from_lookup(lookup: &dyn Lookup) -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_lookup(lookup)?,
            logging: LoggingConfig::from_lookup(lookup),
            github: GitHubOAuthConfig::from_lookup(lookup)?,
            session: SessionConfig::from_lookup(lookup)?,
            deployment: DeploymentConfig::from_lookup(lookup)?,
        })
    }

    /// Presence report for the diagnostics endpoint. Never carries secret values.
    pub fn status(&self) -> ConfigStatus {
        ConfigStatus {
            github_client_id: Presence::of(&self.github.client_id),
            github_client_secret: Presence::from(self.github.client_secret.is_some()),
            public_base_url: Presence::of(&self.github.public_base_url),
            backend_base_url: Presence::from(self.github.backend_base_url.is_some()),
            session_cookie_key: Presence::from(self.session.cookie_key.is_some()),
            token_exchange: self.github.exchange_mode().name(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_lookup(lookup: &dyn Lookup) -> Result<Self, ConfigError> {
        Ok(Self {
            host: optional(lookup, "SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed_or(lookup, "SERVER_PORT", 3000)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging Configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub modules: HashMap<String, String>,
}

impl LoggingConfig {
    pub fn from_lookup(lookup: &dyn Lookup) -> Self {
        let mut modules = HashMap::new();

        if let Some(level) = optional(lookup, "LOG_MODULE_API") {
            modules.insert("api".to_string(), level);
        }
        if let Some(level) = optional(lookup, "LOG_MODULE_SERVICES") {
            modules.insert("services".to_string(), level);
        }

        Self {
            level: optional(lookup, "LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            format: optional(lookup, "LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
            modules,
        }
    }

    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub fn filter_directive(&self) -> String {
        let mut directive = self.level.clone();
        let mut modules: Vec<_> = self.modules.iter().collect();
        modules.sort();
        for (module, level) in modules {
            directive.push_str(&format!(",{module}={level}"));
        }
        directive
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            modules: HashMap::new(),
        }
    }
}

/// GitHub OAuth app registration plus the endpoints the portal talks to.
#[derive(Clone)]
pub struct GitHubOAuthConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    /// Externally visible origin of this service, without a trailing slash.
    pub public_base_url: String,
    /// When set and no client secret is configured, code exchange is delegated here.
    pub backend_base_url: Option<String>,
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
    pub repos_page_size: u32,
    pub http_timeout: Duration,
}

/// How an authorization code is turned into an access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenExchangeMode<'a> {
    /// Exchange directly with GitHub using the client secret.
    Direct { client_secret: &'a str },
    /// Delegate to a backend that holds the secret.
    Backend { base_url: &'a str },
}

impl TokenExchangeMode<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::Backend { .. } => "backend",
        }
    }
}

impl GitHubOAuthConfig {
    pub fn from_lookup(lookup: &dyn Lookup) -> Result<Self, ConfigError> {
        let client_id = required(lookup, "GITHUB_CLIENT_ID")?;
        let public_base_url = required(lookup, "PUBLIC_BASE_URL")?;
        let client_secret = optional(lookup, "GITHUB_CLIENT_SECRET");
        let backend_base_url = optional(lookup, "BACKEND_BASE_URL");

        if client_secret.is_none() && backend_base_url.is_none() {
            return Err(ConfigError::Missing {
                var: "GITHUB_CLIENT_SECRET",
            });
        }

        let scopes = optional(lookup, "GITHUB_OAUTH_SCOPES")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|scopes| !scopes.is_empty())
            .unwrap_or_else(|| DEFAULT_GITHUB_SCOPES.iter().map(|s| s.to_string()).collect());

        let repos_page_size: u32 =
            parsed_or(lookup, "GITHUB_REPOS_PAGE_SIZE", DEFAULT_REPOS_PAGE_SIZE)?;
        let timeout_secs: u64 = parsed_or(lookup, "GITHUB_HTTP_TIMEOUT_SECS", 30)?;

        Ok(Self {
            client_id,
            client_secret,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            backend_base_url: backend_base_url.map(|url| url.trim_end_matches('/').to_string()),
            scopes,
            authorize_url: optional(lookup, "GITHUB_AUTHORIZE_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_AUTHORIZE_URL.to_string()),
            token_url: optional(lookup, "GITHUB_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_TOKEN_URL.to_string()),
            api_base_url: optional(lookup, "GITHUB_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE_URL.to_string()),
            repos_page_size: repos_page_size.clamp(1, MAX_REPOS_PAGE_SIZE),
            http_timeout: Duration::from_secs(timeout_secs.max(1)),
        })
    }

    /// Callback URL registered with the OAuth app.
    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.public_base_url)
    }

    /// A configured secret always wins over the backend.
    pub fn exchange_mode(&self) -> TokenExchangeMode<'_> {
        match (&self.client_secret, &self.backend_base_url) {
            (Some(secret), _) => TokenExchangeMode::Direct {
                client_secret: secret,
            },
            (None, Some(base_url)) => TokenExchangeMode::Backend { base_url },
            // from_lookup rejects this combination; treat a hand-built one as direct with no secret
            (None, None) => TokenExchangeMode::Direct { client_secret: "" },
        }
    }
}

impl fmt::Debug for GitHubOAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubOAuthConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("public_base_url", &self.public_base_url)
            .field("backend_base_url", &self.backend_base_url)
            .field("scopes", &self.scopes)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .field("repos_page_size", &self.repos_page_size)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

/// Browser session settings.
#[derive(Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Master key for cookie encryption. `None` means an ephemeral key is generated at startup.
    pub cookie_key: Option<String>,
    pub ttl: Duration,
    pub secure_cookies: bool,
    pub state_ttl: Duration,
    pub post_login_redirect: String,
}

impl SessionConfig {
    pub fn from_lookup(lookup: &dyn Lookup) -> Result<Self, ConfigError> {
        let cookie_key = optional(lookup, "SESSION_COOKIE_KEY");
        if let Some(key) = &cookie_key {
            if key.len() < MIN_COOKIE_KEY_BYTES {
                return Err(ConfigError::Invalid {
                    var: "SESSION_COOKIE_KEY",
                    reason: format!(
                        "must be at least {MIN_COOKIE_KEY_BYTES} bytes, got {}",
                        key.len()
                    ),
                });
            }
        }

        let ttl_hours: u64 = parsed_or(lookup, "SESSION_TTL_HOURS", 24)?;
        let ttl_secs = ttl_hours.checked_mul(3600).ok_or(ConfigError::Invalid {
            var: "SESSION_TTL_HOURS",
            reason: format!("{ttl_hours} hours is out of range"),
        })?;
        let state_ttl_secs: u64 = parsed_or(lookup, "OAUTH_STATE_TTL_SECS", 600)?;

        Ok(Self {
            cookie_name: optional(lookup, "SESSION_COOKIE_NAME")
                .unwrap_or_else(|| "deploy_session".to_string()),
            cookie_key,
            ttl: Duration::from_secs(ttl_secs),
            secure_cookies: parsed_or(lookup, "SESSION_SECURE_COOKIES", true)?,
            state_ttl: Duration::from_secs(state_ttl_secs),
            post_login_redirect: optional(lookup, "POST_LOGIN_REDIRECT")
                .unwrap_or_else(|| "/".to_string()),
        })
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("cookie_name", &self.cookie_name)
            .field("cookie_key", &self.cookie_key.as_ref().map(|_| "<redacted>"))
            .field("ttl", &self.ttl)
            .field("secure_cookies", &self.secure_cookies)
            .field("state_ttl", &self.state_ttl)
            .field("post_login_redirect", &self.post_login_redirect)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    pub simulated_delay: Duration,
}

impl DeploymentConfig {
    pub fn from_lookup(lookup: &dyn Lookup) -> Result<Self, ConfigError> {
        let delay_ms: u64 = parsed_or(lookup, "DEPLOY_SIMULATED_DELAY_MS", 2000)?;
        Ok(Self {
            simulated_delay: Duration::from_millis(delay_ms),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Set,
    Missing,
}

impl Presence {
    fn of(value: &str) -> Self {
        Self::from(!value.trim().is_empty())
    }
}

impl From<bool> for Presence {
    fn from(present: bool) -> Self {
        if present {
            Self::Set
        } else {
            Self::Missing
        }
    }
}

/// Which configuration values are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigStatus {
    pub github_client_id: Presence,
    pub github_client_secret: Presence,
    pub public_base_url: Presence,
    pub backend_base_url: Presence,
    pub session_cookie_key: Presence,
    pub token_exchange: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("GITHUB_CLIENT_ID", "Iv1.abc"),
        ("GITHUB_CLIENT_SECRET", "shh"),
        ("PUBLIC_BASE_URL", "https://deploy.example.com/"),
    ];

    #[test]
    fn test_minimal_environment_uses_defaults() {
        let config = ApiConfig::from_lookup(&env_of(MINIMAL)).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.github.scopes, vec!["read:user", "user:email", "repo"]);
        assert_eq!(config.github.authorize_url, DEFAULT_GITHUB_AUTHORIZE_URL);
        assert_eq!(config.github.repos_page_size, 50);
        assert_eq!(
            config.github.redirect_uri(),
            "https://deploy.example.com/auth/callback"
        );
        assert_eq!(config.session.cookie_name, "deploy_session");
        assert!(config.session.secure_cookies);
        assert_eq!(config.session.ttl, Duration::from_secs(24 * 3600));
        assert_eq!(config.session.state_ttl, Duration::from_secs(600));
        assert_eq!(config.deployment.simulated_delay, Duration::from_millis(2000));
        assert_eq!(config.github.exchange_mode().name(), "direct");
    }

    #[test]
    fn test_missing_client_id_is_reported() {
        let lookup = env_of(&[("GITHUB_CLIENT_SECRET", "shh"), ("PUBLIC_BASE_URL", "http://x")]);
        let err = ApiConfig::from_lookup(&lookup).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing {
                var: "GITHUB_CLIENT_ID"
            }
        );
    }

    #[test]
    fn test_blank_secret_counts_as_missing() {
        let lookup = env_of(&[
            ("GITHUB_CLIENT_ID", "Iv1.abc"),
            ("GITHUB_CLIENT_SECRET", "   "),
            ("PUBLIC_BASE_URL", "http://x"),
        ]);
        let err = ApiConfig::from_lookup(&lookup).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing {
                var: "GITHUB_CLIENT_SECRET"
            }
        );
    }

    #[test]
    fn test_backend_mode_without_secret() {
        let lookup = env_of(&[
            ("GITHUB_CLIENT_ID", "Iv1.abc"),
            ("PUBLIC_BASE_URL", "http://localhost:3000"),
            ("BACKEND_BASE_URL", "https://backend.example.com/"),
        ]);
        let config = ApiConfig::from_lookup(&lookup).unwrap();
        assert_eq!(
            config.github.exchange_mode(),
            TokenExchangeMode::Backend {
                base_url: "https://backend.example.com"
            }
        );

        let status = config.status();
        assert_eq!(status.github_client_secret, Presence::Missing);
        assert_eq!(status.backend_base_url, Presence::Set);
        assert_eq!(status.token_exchange, "backend");
    }

    #[test]
    fn test_page_size_is_clamped() {
        let lookup = env_of(&[
            ("GITHUB_CLIENT_ID", "Iv1.abc"),
            ("GITHUB_CLIENT_SECRET", "shh"),
            ("PUBLIC_BASE_URL", "http://x"),
            ("GITHUB_REPOS_PAGE_SIZE", "500"),
        ]);
        let config = ApiConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.github.repos_page_size, MAX_REPOS_PAGE_SIZE);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let lookup = env_of(&[
            ("GITHUB_CLIENT_ID", "Iv1.abc"),
            ("GITHUB_CLIENT_SECRET", "shh"),
            ("PUBLIC_BASE_URL", "http://x"),
            ("SERVER_PORT", "http"),
        ]);
        let err = ApiConfig::from_lookup(&lookup).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SERVER_PORT", .. }));
    }

    #[test]
    fn test_short_cookie_key_is_rejected() {
        let lookup = env_of(&[
            ("GITHUB_CLIENT_ID", "Iv1.abc"),
            ("GITHUB_CLIENT_SECRET", "shh"),
            ("PUBLIC_BASE_URL", "http://x"),
            ("SESSION_COOKIE_KEY", "too-short"),
        ]);
        let err = ApiConfig::from_lookup(&lookup).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "SESSION_COOKIE_KEY",
                ..
            }
        ));
    }

    #[test]
    fn test_session_ttl_out_of_range_is_rejected() {
        let lookup = env_of(&[("SESSION_TTL_HOURS", "18446744073709551615")]);
        let err = SessionConfig::from_lookup(&lookup).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "SESSION_TTL_HOURS",
                ..
            }
        ));

        let lookup = env_of(&[("SESSION_TTL_HOURS", "2")]);
        let config = SessionConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.ttl, Duration::from_secs(7200));
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let config = ApiConfig::from_lookup(&env_of(MINIMAL)).unwrap();
        let rendered = format!("{:?}", config.github);
        assert!(!rendered.contains("shh"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_filter_directive_includes_modules() {
        let mut logging = LoggingConfig::default();
        logging.modules.insert("api".to_string(), "debug".to_string());
        assert_eq!(logging.filter_directive(), "info,api=debug");
    }
}
