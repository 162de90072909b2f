//! Domain services for the referral ledger.
//!
//! [`ReferralLedger`] holds the business rules; storage is reached through
//! the [`LedgerStore`] and [`ProfileDirectory`] traits.

mod attribution;
mod balance;
pub mod commission;
pub mod config_cache;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod store;
pub mod withdrawal;

pub use commission::ReleaseSummary;
pub use config_cache::{ConfigCache, DEFAULT_CONFIG_TTL};
pub use error::{LedgerError, StoreError, UniqueConstraint};
pub use ledger::ReferralLedger;
pub use memory::{InMemoryLedgerStore, InMemoryProfileDirectory};
pub use store::{LedgerStore, PayoutOutcome, ProfileDirectory};
pub use withdrawal::{plan_payout, PayoutSettlement};
