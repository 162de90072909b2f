//! Cryptographic utilities for webhook signature verification.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Error type for signing operations.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("Failed to initialize HMAC: {0}")]
    InvalidKey(String),
}

/// Prefix used by signature headers (`sha256=<hex>`).
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Signs a payload with HMAC-SHA256 and returns `sha256=<hex>`.
pub fn sign_payload(payload: &[u8], secret: &str) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    mac.update(payload);
    Ok(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verifies a `sha256=<hex>` signature header against the payload.
///
/// Comparison is constant-time via `Mac::verify_slice`.
pub fn verify_signature(payload: &[u8], secret: &str, signature_header: &str) -> bool {
    let Some(hex_sig) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sign_payload_format() {
        let signature = sign_payload(br#"{"amount":"1000.00"}"#, "webhook-secret").unwrap();
        assert!(signature.starts_with("sha256="));
        assert_eq!(signature.len(), "sha256=".len() + 64);
    }

    #[test]
    fn test_verify_signature_accepts_own_signature() {
        let payload = br#"{"referred_user_id":"550e8400-e29b-41d4-a716-446655440000"}"#;
        let signature = sign_payload(payload, "webhook-secret").unwrap();
        assert!(verify_signature(payload, "webhook-secret", &signature));
    }

    #[test]
    fn test_verify_signature_rejects_wrong_secret() {
        let payload = b"payload";
        let signature = sign_payload(payload, "secret-a").unwrap();
        assert!(!verify_signature(payload, "secret-b", &signature));
    }

    #[test]
    fn test_verify_signature_rejects_tampered_payload() {
        let signature = sign_payload(b"amount=10", "secret").unwrap();
        assert!(!verify_signature(b"amount=1000", "secret", &signature));
    }

    #[test]
    fn test_verify_signature_rejects_malformed_header() {
        assert!(!verify_signature(b"payload", "secret", "md5=abc"));
        assert!(!verify_signature(b"payload", "secret", "sha256=not-hex"));
        assert!(!verify_signature(b"payload", "secret", ""));
    }
}
