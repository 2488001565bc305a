//! JWT token generation and verification.

use std::path::{Path, PathBuf};

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{debug, info};

use super::AuthError;
use crate::models::auth::{TokenClaims, TokenKind};
use crate::uuid::uuidv7;

/// Access token lifetime: 1 hour.
pub const ACCESS_TOKEN_EXPIRY_SECS: u64 = 60 * 60;

/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

/// The only algorithm tokens are signed and accepted with.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Signs and verifies tokens with a single shared secret.
///
/// The secret is injected at construction and never changes afterwards.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a signed token for `user_id` valid for `ttl_secs` from now.
    pub fn issue(&self, user_id: &str, kind: TokenKind, ttl_secs: u64) -> Result<String, AuthError> {
        self.issue_at(user_id, kind, ttl_secs, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (unix seconds).
    pub fn issue_at(
        &self,
        user_id: &str,
        kind: TokenKind,
        ttl_secs: u64,
        now: i64,
    ) -> Result<String, AuthError> {
        let ttl = i64::try_from(ttl_secs)
            .map_err(|_| AuthError::ValidationError(format!("ttl out of range: {ttl_secs}")))?;
        let claims = TokenClaims {
            user_id: user_id.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
            token_type: kind,
            jti: uuidv7().to_string(),
        };
        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
    }

    /// Verify a token, returning the claims on success.
    ///
    /// Bad signatures, malformed input and expired tokens all yield `None`.
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify a token as if the current time were `now` (unix seconds).
    /// A token is expired from the instant `now == exp`.
    pub fn verify_at(&self, token: &str, now: i64) -> Option<TokenClaims> {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is checked below without leeway.
        validation.validate_exp = false;
        let claims = match decode::<TokenClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!(error = %e, "token rejected");
                return None;
            }
        };
        if now >= claims.exp {
            debug!(user_id = %claims.user_id, "token expired");
            return None;
        }
        Some(claims)
    }

    /// Decode the payload without checking signature or expiry.
    ///
    /// For diagnostics only: the result must never be used to authorize
    /// anything.
    pub fn decode_unverified(token: &str) -> Option<TokenClaims> {
        let mut validation = Validation::new(ALGORITHM);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .ok()
            .map(|data| data.claims)
    }
}

/// Look up an existing JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` →
/// persisted file. Never creates anything.
pub fn load_jwt_secret() -> Option<String> {
    for var in ["JWT_SECRET", "AUTH_SECRET"] {
        if let Ok(secret) = std::env::var(var)
            && !secret.is_empty()
        {
            return Some(secret);
        }
    }
    read_secret_file(&jwt_secret_path())
}

/// Resolve the JWT secret, generating and persisting one when none exists.
///
/// Fails if a generated secret cannot be written: an unpersisted secret
/// would silently change on every restart.
pub fn resolve_jwt_secret() -> Result<String, AuthError> {
    if let Some(secret) = load_jwt_secret() {
        return Ok(secret);
    }
    load_or_create_secret_file(&jwt_secret_path())
}

fn read_secret_file(path: &Path) -> Option<String> {
    let existing = std::fs::read_to_string(path).ok()?;
    let trimmed = existing.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn load_or_create_secret_file(path: &Path) -> Result<String, AuthError> {
    if let Some(secret) = read_secret_file(path) {
        return Ok(secret);
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    let persist = |e: std::io::Error| {
        AuthError::Internal(format!("persist JWT secret to {}: {e}", path.display()))
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(persist)?;
    }
    std::fs::write(path, &secret).map_err(persist)?;
    info!(path = %path.display(), "generated new JWT secret");
    Ok(secret)
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("emporium")
        .join("jwt-secret")
}
