//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod commission;
pub mod profile;
pub mod referral;
pub mod referral_config;
pub mod withdrawal_request;

pub use commission::{BalanceEntity, CommissionEntity, CommissionStatusDb};
pub use profile::ProfileNameEntity;
pub use referral::{ReferralEntity, ReferralStatusDb};
pub use referral_config::{CommissionTypeDb, ReferralConfigEntity};
pub use withdrawal_request::{PixKeyTypeDb, WithdrawalRequestEntity, WithdrawalStatusDb};
