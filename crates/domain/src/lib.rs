//! Domain layer for the referral ledger.
//!
//! This crate contains:
//! - Domain models (ReferralConfig, Referral, Commission, WithdrawalRequest)
//! - The ledger service (attribution, commissions, balances, withdrawals)
//! - Store abstractions and domain error types

pub mod models;
pub mod services;
