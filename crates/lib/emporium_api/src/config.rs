//! API server configuration.

use emporium_core::auth::AuthError;
use emporium_core::auth::jwt::resolve_jwt_secret;
use emporium_core::auth::manager::DEFAULT_SESSION_TTL_SECS;
use emporium_core::auth::oauth::{OAuthCredentials, github, google};

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Lifetime of sessions created by login endpoints.
    pub session_ttl_secs: u64,
    /// Google client credentials, if Google sign-in is enabled.
    pub google: Option<OAuthCredentials>,
    /// GitHub client credentials, if GitHub sign-in is enabled.
    pub github: Option<OAuthCredentials>,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                                     | Default                              |
    /// |----------------------------------------------|--------------------------------------|
    /// | `BIND_ADDR`                                  | `127.0.0.1:3100`                     |
    /// | `DATABASE_URL`                               | `postgres://localhost:5432/emporium` |
    /// | `JWT_SECRET` / `AUTH_SECRET`                 | generated & persisted to file        |
    /// | `SESSION_TTL_SECS`                           | `3600`                               |
    /// | `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`  | unset (Google disabled)              |
    /// | `GITHUB_CLIENT_ID` / `GITHUB_CLIENT_SECRET`  | unset (GitHub disabled)              |
    ///
    /// Fails only when a JWT secret has to be generated and cannot be
    /// persisted.
    pub fn from_env() -> Result<Self, AuthError> {
        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/emporium".into()),
            jwt_secret: resolve_jwt_secret()?,
            session_ttl_secs: std::env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|ttl| *ttl > 0)
                .unwrap_or(DEFAULT_SESSION_TTL_SECS),
            google: credentials_from_env("GOOGLE"),
            github: credentials_from_env("GITHUB"),
        })
    }

    /// Providers with credentials configured, as `(name, credentials)`.
    pub fn oauth_credentials(&self) -> Vec<(&'static str, OAuthCredentials)> {
        let mut out = Vec::new();
        if let Some(c) = &self.google {
            out.push((google::NAME, c.clone()));
        }
        if let Some(c) = &self.github {
            out.push((github::NAME, c.clone()));
        }
        out
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("pg_connection_url", &self.pg_connection_url)
            .field("jwt_secret", &"<redacted>")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("google", &self.google)
            .field("github", &self.github)
            .finish()
    }
}

/// Read `{PREFIX}_CLIENT_ID` and `{PREFIX}_CLIENT_SECRET`; both must be set.
fn credentials_from_env(prefix: &str) -> Option<OAuthCredentials> {
    let id = std::env::var(format!("{prefix}_CLIENT_ID")).ok()?;
    let secret = std::env::var(format!("{prefix}_CLIENT_SECRET")).ok()?;
    if id.is_empty() || secret.is_empty() {
        return None;
    }
    Some(OAuthCredentials::new(id, secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ApiConfig {
        ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            pg_connection_url: "postgres://localhost/test".into(),
            jwt_secret: "super-secret-value".into(),
            session_ttl_secs: 60,
            google: Some(OAuthCredentials::new("g-id", "g-secret")),
            github: None,
        }
    }

    #[test]
    fn debug_redacts_secrets() {
        let debug = format!("{:?}", config());
        assert!(!debug.contains("super-secret-value"));
        assert!(!debug.contains("g-secret"));
        assert!(debug.contains("g-id"));
    }

    #[test]
    fn oauth_credentials_lists_configured_only() {
        let names: Vec<&str> = config()
            .oauth_credentials()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["google"]);
    }
}
