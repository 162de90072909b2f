//! HTTP route handlers.

pub mod admin_commissions;
pub mod admin_referral_config;
pub mod admin_withdrawals;
pub mod health;
pub mod referrals;
pub mod webhooks;
pub mod withdrawals;

use domain::services::LedgerError;

use crate::error::ApiError;
use crate::middleware::metrics::record_ledger_rejection;

/// Maps a ledger failure to an API error, counting business rejections.
pub(crate) fn ledger_failure(operation: &'static str) -> impl Fn(LedgerError) -> ApiError {
    move |err| {
        if !matches!(err, LedgerError::Store(_)) {
            record_ledger_rejection(operation, err.code());
        }
        ApiError::Ledger(err)
    }
}
