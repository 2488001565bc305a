//! Password hashing via bcrypt.
//!
//! Accounts migrated from the legacy store carry an unsalted SHA-256 hex
//! digest instead of a bcrypt hash; those are still accepted on login.

use std::sync::LazyLock;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::AuthError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash or a legacy SHA-256 hex digest.
///
/// Both paths compare in constant time.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    if is_legacy_sha256(hash) {
        let candidate = legacy_sha256_hex(password);
        return Ok(candidate
            .as_bytes()
            .ct_eq(hash.to_ascii_lowercase().as_bytes())
            .into());
    }
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

/// Run a bcrypt verification against a throwaway hash and return `false`.
///
/// Login attempts with no stored hash call this so they cost the same as a
/// wrong password.
pub fn verify_dummy(password: &str) -> bool {
    static DUMMY_HASH: LazyLock<Option<String>> =
        LazyLock::new(|| bcrypt::hash("emporium-dummy-password", BCRYPT_COST).ok());
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = bcrypt::verify(password, hash);
    }
    false
}

/// Hex SHA-256 digest, the legacy password format.
pub fn legacy_sha256_hex(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

fn is_legacy_sha256(hash: &str) -> bool {
    hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_verification_never_succeeds() {
        assert!(!verify_dummy("emporium-dummy-password"));
        assert!(!verify_dummy(""));
    }

    #[test]
    fn bcrypt_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn legacy_digest_is_accepted() {
        // sha256("password")
        let hash = "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8";
        assert_eq!(legacy_sha256_hex("password"), hash);
        assert!(verify_password("password", hash).unwrap());
        assert!(verify_password("password", &hash.to_uppercase()).unwrap());
        assert!(!verify_password("Password", hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-hash").is_err());
    }
}
