//! Authentication manager: password and OAuth2 login, session lifecycle.
//!
//! Per user id the manager tracks one of two states: no session, or one
//! active session token held by the [`SessionStore`] under
//! `session:{user_id}`. Creating a session overwrites any previous one, so
//! a user has at most one verifiable token at a time; when two sessions
//! are created concurrently the last store write wins.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::AuthError;
use super::jwt::{REFRESH_TOKEN_EXPIRY_SECS, TokenCodec};
use super::oauth::OAuthProvider;
use super::password::{verify_dummy, verify_password};
use super::session::{SessionStore, session_key};
use super::users::UserRepository;
use crate::models::auth::{NewUser, TokenKind, User};

/// Default session lifetime: 1 hour.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Orchestrates the token codec, OAuth2 providers, session store and user
/// repository. Built once at startup and shared behind an `Arc`.
pub struct AuthManager {
    codec: TokenCodec,
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionStore>,
    providers: HashMap<String, Arc<dyn OAuthProvider>>,
}

impl AuthManager {
    pub fn new(
        codec: TokenCodec,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            codec,
            users,
            sessions,
            providers: HashMap::new(),
        }
    }

    /// Register an OAuth2 provider under `name` (e.g. `"google"`).
    /// Registering the same name again replaces the previous provider.
    pub fn register_oauth_provider(&mut self, name: impl Into<String>, provider: Arc<dyn OAuthProvider>) {
        let name = name.into();
        info!(provider = %name, "registered oauth provider");
        self.providers.insert(name, provider);
    }

    /// Names of all registered providers, sorted.
    pub fn oauth_providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    fn provider(&self, name: &str) -> Result<&Arc<dyn OAuthProvider>, AuthError> {
        self.providers
            .get(name)
            .ok_or_else(|| AuthError::Authentication(format!("Unknown provider: {name}")))
    }

    /// Authorization URL of a registered provider.
    pub fn authorization_url(
        &self,
        provider_name: &str,
        redirect_uri: &str,
        state: &str,
    ) -> Result<String, AuthError> {
        Ok(self
            .provider(provider_name)?
            .build_auth_url(redirect_uri, state))
    }

    /// Authenticate with email and password.
    ///
    /// Unknown email, password-less account and wrong password all fail with
    /// the same [`AuthError::Authentication`].
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Some(record) = self.users.find_by_email(email).await? else {
            verify_dummy(password);
            debug!("login failed: unknown email");
            return Err(AuthError::invalid_credentials());
        };

        let Some(hash) = record.password_hash.as_deref() else {
            verify_dummy(password);
            debug!(user_id = %record.id, "login failed: account has no password");
            return Err(AuthError::invalid_credentials());
        };

        match verify_password(password, hash) {
            Ok(true) => {}
            Ok(false) => {
                debug!(user_id = %record.id, "login failed: wrong password");
                return Err(AuthError::invalid_credentials());
            }
            Err(e) => {
                warn!(user_id = %record.id, error = %e, "stored password hash is unreadable");
                return Err(AuthError::invalid_credentials());
            }
        }

        info!(user_id = %record.id, "password login");
        Ok(record.sanitize())
    }

    /// Authenticate via an OAuth2 authorization code, creating the user on
    /// first login.
    pub async fn login_oauth(
        &self,
        provider_name: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<User, AuthError> {
        let provider = self.provider(provider_name)?;

        let profile = provider.exchange_code(code, redirect_uri).await?;

        let record = match self
            .users
            .find_by_oauth_id(provider_name, &profile.id)
            .await?
        {
            Some(existing) => existing,
            None => {
                // An existing account with the same email is never linked
                // implicitly; its owner signs in the way they registered.
                let created = self
                    .users
                    .create(NewUser {
                        email: profile.email,
                        name: profile.name,
                        password_hash: None,
                        oauth_id: Some(profile.id),
                        oauth_provider: Some(provider_name.to_string()),
                    })
                    .await
                    .map_err(|e| match e {
                        AuthError::Conflict(detail) => {
                            warn!(
                                provider = provider_name,
                                %detail,
                                "oauth login collides with existing account"
                            );
                            AuthError::Authentication(
                                "An account with this email already exists".into(),
                            )
                        }
                        other => other,
                    })?;
                info!(user_id = %created.id, provider = provider_name, "created user from oauth profile");
                created
            }
        };

        info!(user_id = %record.id, provider = provider_name, "oauth login");
        Ok(record.sanitize())
    }

    /// Issue an access token for `user` and make it the user's only active
    /// session for `ttl_secs` seconds.
    pub async fn create_session(&self, user: &User, ttl_secs: u64) -> Result<String, AuthError> {
        if ttl_secs == 0 {
            return Err(AuthError::ValidationError(
                "session ttl must be at least one second".into(),
            ));
        }
        let token = self.codec.issue(&user.id, TokenKind::Access, ttl_secs)?;
        self.sessions
            .set(&session_key(&user.id), &token, ttl_secs)
            .await?;
        debug!(user_id = %user.id, ttl_secs, "session created");
        Ok(token)
    }

    /// Resolve a session token to its user.
    ///
    /// Returns `Ok(None)` when the token is invalid, expired, not an access
    /// token, superseded by a newer session, logged out, or its user no
    /// longer exists. Store and repository failures are errors.
    pub async fn verify_session(&self, token: &str) -> Result<Option<User>, AuthError> {
        let Some(claims) = self.codec.verify(token) else {
            return Ok(None);
        };
        if claims.token_type != TokenKind::Access {
            debug!(user_id = %claims.user_id, "session rejected: not an access token");
            return Ok(None);
        }

        let stored = self.sessions.get(&session_key(&claims.user_id)).await?;
        if stored.as_deref() != Some(token) {
            debug!(user_id = %claims.user_id, "session rejected: not the active token");
            return Ok(None);
        }

        let user = self.users.find_by_id(&claims.user_id).await?;
        Ok(user.map(|record| record.sanitize()))
    }

    /// End the user's session. No effect if there is none.
    pub async fn logout(&self, user_id: &str) -> Result<(), AuthError> {
        self.sessions.delete(&session_key(user_id)).await?;
        info!(user_id, "logged out");
        Ok(())
    }

    /// Issue a refresh token for `user` (7 days). Refresh tokens are not
    /// tracked by the session store and never verify as a session.
    pub fn issue_refresh_token(&self, user: &User) -> Result<String, AuthError> {
        self.codec
            .issue(&user.id, TokenKind::Refresh, REFRESH_TOKEN_EXPIRY_SECS)
    }
}
