//! HMAC-signed JWT encoding and verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{TokenClaims, TokenKind, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed or tampered token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("expected a {expected} token, got {actual}")]
    WrongKind {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("failed to sign token: {0}")]
    Encode(String),

    #[error("token lifetime out of range")]
    LifetimeOutOfRange,

    #[error("unsupported algorithm {0:?}")]
    UnsupportedAlgorithm(Algorithm),
}

/// Validates bearer tokens presented to protected routes.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError>;
}

/// Signs and verifies tokens with a shared secret.
#[derive(Clone)]
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
}

impl core::fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JwtCodec")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl JwtCodec {
    /// Only the HMAC family is accepted; the secret is shared.
    pub fn new(secret: impl AsRef<[u8]>, algorithm: Algorithm) -> Result<Self, TokenError> {
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(TokenError::UnsupportedAlgorithm(algorithm));
        }
        let secret = secret.as_ref();
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            algorithm,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn issue(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(self.algorithm), claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Verify signature, time window and purpose of a token.
    pub fn decode(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Time checks run against the caller's clock in validate_claims.
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        let claims = data.claims;

        if claims.token_type != expected {
            return Err(TokenError::WrongKind {
                expected: expected.as_str(),
                actual: claims.token_type.as_str(),
            });
        }
        validate_claims(&claims, now)?;
        Ok(claims)
    }
}

impl TokenValidator for JwtCodec {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        self.decode(token, TokenKind::Access, now)
    }
}
