//! Persistence layer for the referral ledger.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - Postgres implementations of the ledger store traits

pub mod db;
pub mod entities;
pub mod ledger_store;
pub mod metrics;
pub mod repositories;

pub use ledger_store::{PgLedgerStore, PgProfileDirectory};
