//! Balance aggregation.

use uuid::Uuid;

use crate::models::UserReferralBalance;

use super::error::LedgerError;
use super::ledger::ReferralLedger;

impl ReferralLedger {
    /// Derives the user's balance from their commissions and withdrawals.
    ///
    /// A user without referral activity has an all-zero balance.
    pub async fn get_balance(&self, user_id: Uuid) -> Result<UserReferralBalance, LedgerError> {
        Ok(self.store.balance_for(user_id).await?)
    }
}
