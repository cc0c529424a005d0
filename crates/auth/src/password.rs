//! Password policy and hashing.
//!
//! Hashes are Argon2id PHC strings (`$argon2id$v=19$...`), so the algorithm
//! parameters and salt travel with the stored value.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("{0}")]
    Weak(&'static str),

    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("stored password hash is malformed")]
    MalformedHash,
}

/// Enforce the password policy.
///
/// Checks run in a fixed order so the first failing rule is reported.
pub fn validate_password_strength(password: &str) -> Result<(), PasswordError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(PasswordError::Weak("Password must be at least 8 characters long"));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(PasswordError::Weak("Password must be at most 100 characters long"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordError::Weak("Password must contain at least one number"));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(PasswordError::Weak("Password must contain at least one uppercase letter"));
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(PasswordError::Weak("Password must contain at least one lowercase letter"));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash cannot be parsed.
pub fn verify_password(password: &str, hashed: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hashed).map_err(|_| PasswordError::MalformedHash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Short, non-reversible fingerprint of a stored hash.
///
/// Embedded in password-reset tokens so a token stops working once the
/// password it was issued against has changed.
pub fn hash_fingerprint(hashed: &str) -> String {
    let digest = Sha256::digest(hashed.as_bytes());
    hex::encode(&digest[..8])
}
