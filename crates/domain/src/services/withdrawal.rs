//! Withdrawal gating and processing.

use chrono::Utc;
use rust_decimal::Decimal;
use shared::crypto::sha256_hex;
use uuid::Uuid;

use crate::models::{
    Commission, CommissionStatus, CreateWithdrawalRequest, ListWithdrawalsQuery,
    NewWithdrawalRequest, PageQuery, WithdrawalEligibility, WithdrawalRequest, WithdrawalStatus,
};

use super::error::LedgerError;
use super::ledger::ReferralLedger;
use super::store::PayoutOutcome;

/// Part of a commission paid out by a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutSettlement {
    pub commission_id: Uuid,
    /// Total settled on the commission once this payout is applied.
    pub settled_amount: Decimal,
    /// Nothing is left on the commission; it becomes `withdrawn`.
    pub fully_settled: bool,
}

/// Spreads a payout of `amount` over available commissions, oldest payment
/// first.
///
/// The last commission touched may be settled only in part, so the settled
/// total always equals `amount`. Returns `None` when the unsettled total of
/// the commissions does not cover `amount`.
pub fn plan_payout(available: &[Commission], amount: Decimal) -> Option<Vec<PayoutSettlement>> {
    let mut ordered: Vec<&Commission> = available
        .iter()
        .filter(|c| c.status == CommissionStatus::Available)
        .collect();
    ordered.sort_by_key(|c| (c.payment_date, c.id));

    let mut outstanding = amount;
    let mut plan = Vec::new();
    for commission in ordered {
        if outstanding <= Decimal::ZERO {
            break;
        }
        let open = commission.unsettled_amount();
        if open <= Decimal::ZERO {
            continue;
        }
        let taken = open.min(outstanding);
        outstanding -= taken;
        let settled_amount = commission.settled_amount + taken;
        plan.push(PayoutSettlement {
            commission_id: commission.id,
            settled_amount,
            fully_settled: settled_amount == commission.commission_amount,
        });
    }

    (outstanding <= Decimal::ZERO).then_some(plan)
}

impl ReferralLedger {
    /// Admits a payout request against the user's available balance.
    ///
    /// Checks run in order and stop at the first failure: policy present,
    /// minimum amount, available balance, no other pending request. Approved
    /// requests awaiting payment are already deducted from the balance.
    pub async fn request_withdrawal(
        &self,
        user_id: Uuid,
        request: CreateWithdrawalRequest,
    ) -> Result<WithdrawalRequest, LedgerError> {
        if request.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        let pix_key = request
            .pix_key_type
            .normalize(&request.pix_key)
            .ok_or(LedgerError::InvalidPixKey(request.pix_key_type))?;

        let config = self.config_for_withdrawal().await?;

        if request.amount < config.min_withdrawal_amount {
            return Err(LedgerError::BelowMinimum {
                minimum: config.min_withdrawal_amount,
            });
        }

        let balance = self.store.balance_for(user_id).await?;
        if balance.available_balance < request.amount {
            return Err(LedgerError::InsufficientBalance {
                available: balance.available_balance,
            });
        }

        if self.store.has_pending_withdrawal(user_id).await? {
            return Err(LedgerError::PendingRequestExists);
        }

        let pix_key_hash = sha256_hex(&pix_key);
        let withdrawal = self
            .store
            .insert_withdrawal(
                NewWithdrawalRequest {
                    user_id,
                    amount: request.amount,
                    pix_key,
                    pix_key_type: request.pix_key_type,
                    bank_name: request.bank_name.filter(|name| !name.trim().is_empty()),
                },
                Utc::now(),
            )
            .await
            .map_err(LedgerError::from)?;

        tracing::info!(
            withdrawal_id = %withdrawal.id,
            user_id = %user_id,
            amount = %withdrawal.amount,
            pix_key_type = %withdrawal.pix_key_type,
            pix_key_hash = &pix_key_hash[..16],
            "Withdrawal requested"
        );
        Ok(withdrawal)
    }

    /// Read-only withdrawal gating for the UI.
    pub async fn can_withdraw(&self, user_id: Uuid) -> Result<WithdrawalEligibility, LedgerError> {
        let config = self.config_for_withdrawal().await?;
        let balance = self.store.balance_for(user_id).await?;
        let has_pending_request = self.store.has_pending_withdrawal(user_id).await?;

        Ok(WithdrawalEligibility {
            can_withdraw: balance.available_balance >= config.min_withdrawal_amount
                && !has_pending_request,
            available_balance: balance.available_balance,
            min_amount: config.min_withdrawal_amount,
            has_pending_request,
            next_payment_date: Some(config.next_payment_date(Utc::now().date_naive())),
        })
    }

    /// A user's withdrawal requests, newest first.
    pub async fn list_withdrawals(
        &self,
        user_id: Uuid,
        page: &PageQuery,
    ) -> Result<Vec<WithdrawalRequest>, LedgerError> {
        let (limit, offset) = page.limit_offset();
        Ok(self
            .store
            .list_withdrawals_for_user(user_id, limit, offset)
            .await?)
    }

    /// All withdrawal requests, optionally filtered by status.
    pub async fn list_all_withdrawals(
        &self,
        query: &ListWithdrawalsQuery,
    ) -> Result<Vec<WithdrawalRequest>, LedgerError> {
        let (limit, offset) = query.limit_offset();
        Ok(self
            .store
            .list_withdrawals(query.status, limit, offset)
            .await?)
    }

    pub async fn approve_withdrawal(&self, id: Uuid) -> Result<WithdrawalRequest, LedgerError> {
        self.transition_withdrawal(id, WithdrawalStatus::Approved, None)
            .await
    }

    pub async fn reject_withdrawal(
        &self,
        id: Uuid,
        reason: String,
    ) -> Result<WithdrawalRequest, LedgerError> {
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(LedgerError::InvalidInput("reason is required".into()));
        }
        self.transition_withdrawal(id, WithdrawalStatus::Rejected, Some(reason))
            .await
    }

    /// Marks an approved request paid and settles exactly its amount against
    /// the user's available commissions.
    ///
    /// Fails with `InsufficientBalance` and leaves the request approved when
    /// the commissions no longer cover it (one was cancelled after approval).
    pub async fn pay_withdrawal(&self, id: Uuid) -> Result<WithdrawalRequest, LedgerError> {
        let current = self.find_withdrawal(id).await?;
        let invalid = || LedgerError::InvalidTransition {
            from: current.status.to_string(),
            to: WithdrawalStatus::Paid.to_string(),
        };
        if !current.status.can_transition_to(WithdrawalStatus::Paid) {
            return Err(invalid());
        }

        let (paid, settlements) = match self.store.complete_payout(id, Utc::now()).await? {
            PayoutOutcome::Paid {
                request,
                settlements,
            } => (request, settlements),
            PayoutOutcome::NotApproved => return Err(invalid()),
            PayoutOutcome::Uncovered { available } => {
                tracing::warn!(
                    withdrawal_id = %id,
                    user_id = %current.user_id,
                    amount = %current.amount,
                    available = %available,
                    "Withdrawal not covered by available commissions"
                );
                return Err(LedgerError::InsufficientBalance { available });
            }
        };

        tracing::info!(
            withdrawal_id = %paid.id,
            user_id = %paid.user_id,
            amount = %paid.amount,
            settled_commissions = settlements.len(),
            fully_settled = settlements.iter().filter(|s| s.fully_settled).count(),
            "Withdrawal paid"
        );
        Ok(paid)
    }

    async fn find_withdrawal(&self, id: Uuid) -> Result<WithdrawalRequest, LedgerError> {
        self.store
            .find_withdrawal(id)
            .await?
            .ok_or(LedgerError::NotFound("Withdrawal request"))
    }

    async fn transition_withdrawal(
        &self,
        id: Uuid,
        to: WithdrawalStatus,
        rejection_reason: Option<String>,
    ) -> Result<WithdrawalRequest, LedgerError> {
        let current = self.find_withdrawal(id).await?;
        let invalid = || LedgerError::InvalidTransition {
            from: current.status.to_string(),
            to: to.to_string(),
        };
        if !current.status.can_transition_to(to) {
            return Err(invalid());
        }

        let updated = self
            .store
            .transition_withdrawal(id, current.status, to, rejection_reason, Utc::now())
            .await?
            .ok_or_else(invalid)?;

        tracing::info!(
            withdrawal_id = %updated.id,
            user_id = %updated.user_id,
            from = %current.status,
            to = %updated.status,
            "Withdrawal status changed"
        );
        Ok(updated)
    }
}
