//! Custom Axum extractors.

pub mod signed_payload;
pub mod user_auth;

pub use signed_payload::{SignedPayload, WEBHOOK_SIGNATURE_HEADER};
pub use user_auth::{AdminAuth, UserAuth};
