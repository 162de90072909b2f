//! JWT access token verification.
//!
//! Tokens are issued by the platform's authentication service; this backend
//! only verifies them. Production deployments use RS256 with the issuer's
//! public key. HS256 with a shared secret is supported for local development
//! and tests.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error type for JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to decode token: {0}")]
    DecodingError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Role carried by tokens issued to platform administrators.
pub const ADMIN_ROLE: &str = "admin";

/// JWT token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID (unique token identifier)
    pub jti: String,
    /// Platform role, absent for regular users
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Claims {
    /// Parses the subject claim as a user ID.
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::InvalidToken)
    }

    /// Whether the token belongs to a platform administrator.
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

/// Verification settings for incoming access tokens.
#[derive(Clone)]
pub struct JwtConfig {
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    /// Leeway in seconds for clock skew tolerance
    pub leeway_secs: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("algorithm", &self.algorithm)
            .field("leeway_secs", &self.leeway_secs)
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

/// Default leeway in seconds for clock skew tolerance
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

impl JwtConfig {
    /// Creates a verifier from an RSA public key in PEM format (RS256).
    pub fn from_rsa_public_key(public_key_pem: &str, leeway_secs: u64) -> Result<Self, JwtError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| JwtError::InvalidKey(format!("Invalid public key: {}", e)))?;

        Ok(Self {
            decoding_key,
            algorithm: Algorithm::RS256,
            leeway_secs,
        })
    }

    /// Creates a verifier from a shared secret (HS256).
    pub fn from_secret(secret: &str, leeway_secs: u64) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidKey("Secret must not be empty".to_string()));
        }

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
            leeway_secs,
        })
    }

    /// Creates a verifier from an algorithm name ("RS256" or "HS256") and key material.
    pub fn from_parts(algorithm: &str, key: &str, leeway_secs: u64) -> Result<Self, JwtError> {
        match algorithm.to_ascii_uppercase().as_str() {
            "RS256" => Self::from_rsa_public_key(key, leeway_secs),
            "HS256" => Self::from_secret(key, leeway_secs),
            other => Err(JwtError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// Validates a token and returns its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidToken,
                _ => JwtError::DecodingError(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn issue(user_id: Uuid, role: Option<&str>, expires_in: Duration) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            role: role.map(str::to_string),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_validate_hs256_token() {
        let config = JwtConfig::from_secret(SECRET, 0).unwrap();
        let user_id = Uuid::new_v4();
        let token = issue(user_id, None, Duration::minutes(5));

        let claims = config.validate_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert!(!claims.is_admin());
    }

    #[test]
    fn test_admin_role_claim() {
        let config = JwtConfig::from_secret(SECRET, 0).unwrap();
        let token = issue(Uuid::new_v4(), Some("admin"), Duration::minutes(5));

        let claims = config.validate_token(&token).unwrap();
        assert!(claims.is_admin());
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = JwtConfig::from_secret(SECRET, 0).unwrap();
        let token = issue(Uuid::new_v4(), None, Duration::minutes(-10));

        assert!(matches!(
            config.validate_token(&token),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let config = JwtConfig::from_secret("another-secret", 0).unwrap();
        let token = issue(Uuid::new_v4(), None, Duration::minutes(5));

        assert!(matches!(
            config.validate_token(&token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_from_parts_rejects_unknown_algorithm() {
        assert!(matches!(
            JwtConfig::from_parts("none", "key", 0),
            Err(JwtError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            JwtConfig::from_secret("", 0),
            Err(JwtError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_invalid_rsa_key_rejected() {
        assert!(JwtConfig::from_rsa_public_key("not a pem", 30).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = JwtConfig::from_secret(SECRET, DEFAULT_LEEWAY_SECS).unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(SECRET));
    }
}
