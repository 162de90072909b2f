//! JWT authentication extractors.
//!
//! Tokens are issued by the platform's authentication service and arrive as
//! `Authorization: Bearer <token>`.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use shared::jwt::{Claims, JwtConfig, JwtError};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

/// Authenticated user from the Bearer token.
#[derive(Debug, Clone)]
pub struct UserAuth {
    /// User ID from the JWT subject claim.
    pub user_id: Uuid,
    /// JWT ID (jti) for log correlation.
    pub jti: String,
}

/// Authenticated platform administrator.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    pub user_id: Uuid,
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header format".to_string()))
}

/// Verifies the request's Bearer token and returns its claims.
pub fn authenticate(jwt: &JwtConfig, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let token = bearer_token(headers)?;
    jwt.validate_token(token).map_err(|e| {
        tracing::debug!(error = %e, "JWT validation failed");
        match e {
            JwtError::TokenExpired => ApiError::Unauthorized("Token has expired".to_string()),
            _ => ApiError::Unauthorized("Invalid or expired token".to_string()),
        }
    })
}

fn subject(claims: &Claims) -> Result<Uuid, ApiError> {
    claims
        .user_id()
        .map_err(|_| ApiError::Unauthorized("Invalid user ID in token".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = authenticate(&state.jwt, &parts.headers)?;
        Ok(UserAuth {
            user_id: subject(&claims)?,
            jti: claims.jti,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = authenticate(&state.jwt, &parts.headers)?;
        let user_id = subject(&claims)?;
        if !claims.is_admin() {
            tracing::warn!(user_id = %user_id, "Non-admin token on admin route");
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminAuth { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "extractor-test-secret";

    fn token(sub: &str, role: Option<&str>, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            exp: now + exp_offset,
            iat: now,
            jti: "jti-1".to_string(),
            role: role.map(str::to_string),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn jwt() -> JwtConfig {
        JwtConfig::from_secret(SECRET, 0).unwrap()
    }

    #[test]
    fn test_missing_header_rejected() {
        let err = authenticate(&jwt(), &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_non_bearer_scheme_rejected() {
        let err = authenticate(&jwt(), &headers("Basic dXNlcjpwYXNz")).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(msg) if msg.contains("format")));
    }

    #[test]
    fn test_valid_token_accepted() {
        let user_id = Uuid::new_v4();
        let bearer = format!("Bearer {}", token(&user_id.to_string(), None, 600));

        let claims = authenticate(&jwt(), &headers(&bearer)).unwrap();
        assert_eq!(subject(&claims).unwrap(), user_id);
        assert!(!claims.is_admin());
    }

    #[test]
    fn test_expired_token_rejected() {
        let bearer = format!("Bearer {}", token(&Uuid::new_v4().to_string(), None, -600));
        let err = authenticate(&jwt(), &headers(&bearer)).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(msg) if msg.contains("expired")));
    }

    #[test]
    fn test_non_uuid_subject_rejected() {
        let bearer = format!("Bearer {}", token("not-a-uuid", None, 600));
        let claims = authenticate(&jwt(), &headers(&bearer)).unwrap();
        assert!(subject(&claims).is_err());
    }

    #[test]
    fn test_admin_role_detected() {
        let bearer = format!(
            "Bearer {}",
            token(&Uuid::new_v4().to_string(), Some("admin"), 600)
        );
        let claims = authenticate(&jwt(), &headers(&bearer)).unwrap();
        assert!(claims.is_admin());
    }
}
