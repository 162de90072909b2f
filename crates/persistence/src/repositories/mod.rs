//! Repository implementations for database operations.

pub mod commission;
pub mod profile;
pub mod referral;
pub mod referral_config;
pub mod withdrawal_request;

pub use commission::CommissionRepository;
pub use profile::ProfileRepository;
pub use referral::ReferralRepository;
pub use referral_config::ReferralConfigRepository;
pub use withdrawal_request::{PayoutRow, WithdrawalRequestRepository};
