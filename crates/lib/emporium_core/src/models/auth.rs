//! Authentication domain models.
//!
//! These are internal domain models, distinct from the HTTP request and
//! response shapes in `emporium_api` (which are camelCase on the wire).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of token carried in the `token_type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            other => Err(format!("unknown token kind: {other}")),
        }
    }
}

/// JWT claims embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject user ID.
    pub user_id: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp). The token is rejected from this instant on.
    pub exp: i64,
    /// Access or refresh.
    pub token_type: TokenKind,
    /// Unique token id, so two tokens issued in the same second differ.
    pub jti: String,
}

/// Domain user, sanitized: never carries authentication secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Full user row as stored by a user repository.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub email: Option<String>,
    pub name: String,
    pub password_hash: Option<String>,
    pub oauth_id: Option<String>,
    pub oauth_provider: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Strip the password hash and OAuth linkage.
    pub fn sanitize(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            email: record.email,
            name: record.name,
            created_at: record.created_at,
        }
    }
}

/// Fields for creating a user.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: Option<String>,
    pub name: String,
    pub password_hash: Option<String>,
    pub oauth_id: Option<String>,
    pub oauth_provider: Option<String>,
}

/// Normalized profile returned by an OAuth2 provider. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthProfile {
    /// Provider-side user ID.
    pub id: String,
    pub email: Option<String>,
    pub name: String,
    /// Avatar or picture URL.
    pub avatar_url: Option<String>,
}
