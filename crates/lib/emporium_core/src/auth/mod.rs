//! Authentication and session logic.
//!
//! Provides the token codec, password hashing, OAuth2 provider adapters,
//! session stores, user repositories and the [`manager::AuthManager`] that
//! ties them together.

pub mod jwt;
pub mod manager;
pub mod oauth;
pub mod password;
pub mod session;
pub mod users;

use thiserror::Error;

pub use jwt::TokenCodec;
pub use manager::AuthManager;

/// Authentication errors.
///
/// Invalid or expired tokens are not errors: verification returns `None`.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad credentials or unknown OAuth2 provider. Deliberately carries no
    /// detail about which check failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("OAuth provider error: {0}")]
    Provider(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A user with the same email or OAuth identity already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// The single error returned for every failed password login.
    pub(crate) fn invalid_credentials() -> Self {
        AuthError::Authentication("Invalid email or password".into())
    }
}
