//! Password policy and hashing.
//!
//! Hashes use argon2id with a per-password random salt. Verification goes
//! through `argon2`'s constant-time comparison; a stored hash that fails
//! to parse is treated as a mismatch rather than an error so that login
//! never leaks which side was malformed.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::ValidationError;

/// Symbols accepted by the strength policy.
const SYMBOLS: &str = "!@#$%^&*";

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Enforce the registration password policy: at least 8 characters, at
/// least one digit, and at least one of `!@#$%^&*`. All shortcomings are
/// reported together.
pub fn validate_strength(password: &str) -> Result<(), ValidationError> {
    let mut missing = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LEN {
        missing.push("at least 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("at least 1 number");
    }
    if !password.chars().any(|c| SYMBOLS.contains(c)) {
        missing.push("at least 1 symbol");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::PasswordPolicy(missing.join(", ")))
    }
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Verify a password against a stored hash.
pub fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
