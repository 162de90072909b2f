//! Derived referral balance.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::money::sum;

use super::commission::{Commission, CommissionStatus};
use super::withdrawal::{WithdrawalRequest, WithdrawalStatus};

/// Snapshot of a referrer's earnings.
///
/// Always derived from commission and withdrawal rows, never stored.
/// `available_balance` is the unsettled part of available commissions minus
/// the amounts of approved requests that have not been paid yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UserReferralBalance {
    pub available_balance: Decimal,
    pub pending_balance: Decimal,
    pub total_earned: Decimal,
    pub total_withdrawn: Decimal,
    pub total_referrals: i64,
}

impl UserReferralBalance {
    /// Aggregates a referrer's commissions and withdrawal requests.
    pub fn from_records(
        commissions: &[Commission],
        withdrawals: &[WithdrawalRequest],
        total_referrals: i64,
    ) -> Self {
        let mut balance = UserReferralBalance {
            total_referrals,
            ..Default::default()
        };

        for commission in commissions {
            if commission.status == CommissionStatus::Cancelled {
                continue;
            }
            balance.total_earned += commission.commission_amount;
            if commission.status == CommissionStatus::Available {
                balance.available_balance += commission.unsettled_amount();
            } else if commission.status.is_pending() {
                balance.pending_balance += commission.commission_amount;
            }
        }

        balance.total_withdrawn = sum(
            withdrawals
                .iter()
                .filter(|w| w.status == WithdrawalStatus::Paid)
                .map(|w| w.amount),
        );

        let reserved = sum(
            withdrawals
                .iter()
                .filter(|w| w.status == WithdrawalStatus::Approved)
                .map(|w| w.amount),
        );
        balance.available_balance = (balance.available_balance - reserved).max(Decimal::ZERO);

        balance
    }
}
