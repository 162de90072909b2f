//! Shared utilities and common types for the referral ledger backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Webhook signature verification (HMAC-SHA256)
//! - JWT access token verification
//! - Money arithmetic helpers
//! - Common validation logic

pub mod crypto;
pub mod jwt;
pub mod money;
pub mod validation;
