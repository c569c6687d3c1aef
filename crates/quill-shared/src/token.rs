//! Signed, time-limited tokens.
//!
//! One HS256 secret backs three token families with distinct payload
//! shapes: session tokens carry the principal's role, while email
//! verification and password reset tokens carry a `purpose` tag so a
//! token minted for one flow cannot be replayed against another.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TokenError;
use crate::moderation::Role;

/// Purpose tag for email verification tokens.
pub const PURPOSE_VERIFY_EMAIL: &str = "verify-email";
/// Purpose tag for password reset tokens.
pub const PURPOSE_PASSWORD_RESET: &str = "password-reset";

/// Claims carried by a bearer session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id.
    pub sub: Uuid,
    pub role: Role,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Claims carried by single-action tokens (email verification, password
/// reset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionClaims {
    pub sub: Uuid,
    pub purpose: String,
    pub exp: i64,
}

/// Issues and verifies all token families from a single shared secret.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue_session(
        &self,
        user_id: Uuid,
        role: Role,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        self.sign(&SessionClaims {
            sub: user_id,
            role,
            exp: (Utc::now() + ttl).timestamp(),
        })
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify::<SessionClaims>(token)
    }

    pub fn issue_action(
        &self,
        user_id: Uuid,
        purpose: &str,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        self.sign(&ActionClaims {
            sub: user_id,
            purpose: purpose.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
        })
    }

    /// Verify an action token and check it was minted for `purpose`.
    pub fn verify_action(&self, token: &str, purpose: &str) -> Result<ActionClaims, TokenError> {
        let claims = self.verify::<ActionClaims>(token)?;
        if claims.purpose != purpose {
            return Err(TokenError::Purpose);
        }
        Ok(claims)
    }

    fn sign<C: Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|_| TokenError::Signing)
    }

    fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // No leeway: an expired token is expired, including in tests.
        validation.leeway = 0;

        decode::<C>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}
