//! HMAC-signed webhook body extractor.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::HeaderMap,
};
use serde::de::DeserializeOwned;
use shared::crypto::verify_signature;

use crate::app::AppState;
use crate::error::ApiError;

/// Header carrying `sha256=<hex>` over the raw request body.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// JSON body whose signature has been verified against the webhook secret.
#[derive(Debug, Clone)]
pub struct SignedPayload<T>(pub T);

/// Checks the signature header and decodes the body.
pub fn verify_and_decode<T: DeserializeOwned>(
    secret: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<T, ApiError> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing webhook signature".to_string()))?;

    if !verify_signature(body, secret, signature) {
        tracing::warn!(body_len = body.len(), "Webhook signature mismatch");
        return Err(ApiError::Unauthorized("Invalid webhook signature".to_string()));
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid payload: {}", e)))
}

#[async_trait]
impl<T> FromRequest<AppState> for SignedPayload<T>
where
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let headers = req.headers().clone();
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(format!("Unreadable body: {}", e)))?;

        verify_and_decode(&state.config.referral.webhook_secret, &headers, &body)
            .map(SignedPayload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde::Deserialize;
    use shared::crypto::sign_payload;

    const SECRET: &str = "webhook-secret";

    #[derive(Debug, Deserialize)]
    struct Ping {
        id: u32,
    }

    fn signed_headers(body: &[u8], secret: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let signature = sign_payload(body, secret).unwrap();
        headers.insert(
            WEBHOOK_SIGNATURE_HEADER,
            HeaderValue::from_str(&signature).unwrap(),
        );
        headers
    }

    #[test]
    fn test_valid_signature_decodes() {
        let body = br#"{"id":7}"#;
        let ping: Ping = verify_and_decode(SECRET, &signed_headers(body, SECRET), body).unwrap();
        assert_eq!(ping.id, 7);
    }

    #[test]
    fn test_missing_signature_rejected() {
        let err = verify_and_decode::<Ping>(SECRET, &HeaderMap::new(), b"{}").unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = br#"{"id":7}"#;
        let err =
            verify_and_decode::<Ping>(SECRET, &signed_headers(body, "other"), body).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let headers = signed_headers(br#"{"id":7}"#, SECRET);
        let err = verify_and_decode::<Ping>(SECRET, &headers, br#"{"id":8}"#).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_malformed_json_is_validation_error() {
        let body = b"not json";
        let err =
            verify_and_decode::<Ping>(SECRET, &signed_headers(body, SECRET), body).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
