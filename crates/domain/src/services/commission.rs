//! Commission registration, release and cancellation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Commission, CommissionStatus, NewCommission, PageQuery, ReferralStatus};

use super::error::LedgerError;
use super::ledger::ReferralLedger;

/// Outcome of one release run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReleaseSummary {
    /// Commissions that became available.
    pub released: usize,
    /// Commissions held until the referred user is active.
    pub awaiting_verification: usize,
}

impl ReferralLedger {
    /// Records the commission owed for a payment by a referred user.
    ///
    /// Amount and percentage are snapshotted from the active policy and never
    /// recomputed. The first commission activates the referral.
    /// `external_payment_ref` deduplicates gateway retries.
    pub async fn register_commission(
        &self,
        referred_id: Uuid,
        payment_amount: Decimal,
        external_payment_ref: Option<String>,
    ) -> Result<Commission, LedgerError> {
        if payment_amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }

        let referral = match self.store.find_referral_by_referred(referred_id).await? {
            Some(referral) if referral.status != ReferralStatus::Cancelled => referral,
            _ => return Err(LedgerError::NoReferrer),
        };

        let config = self.config_for_commission().await?;

        if config.is_single_commission()
            && self.store.has_commission_for_referred(referred_id).await?
        {
            tracing::info!(
                referred_id = %referred_id,
                "Duplicate first-payment commission ignored"
            );
            return Err(LedgerError::DuplicateCommission);
        }

        let now = Utc::now();
        let commission_amount = config.commission_for(payment_amount);
        let release_date = config.release_date_from(now);

        let commission = self
            .store
            .insert_commission(
                NewCommission {
                    referral_id: referral.id,
                    referrer_id: referral.referrer_id,
                    referred_id,
                    payment_amount,
                    commission_amount,
                    commission_percentage: config.commission_percentage,
                    commission_type: config.commission_type,
                    external_payment_ref,
                    payment_date: now,
                    release_date,
                },
                now,
            )
            .await
            .map_err(LedgerError::from)?;

        tracing::info!(
            commission_id = %commission.id,
            referral_id = %referral.id,
            referrer_id = %commission.referrer_id,
            referred_id = %referred_id,
            commission_type = %commission.commission_type,
            commission_amount = %commission.commission_amount,
            release_date = %commission.release_date,
            "Commission registered"
        );
        Ok(commission)
    }

    /// Releases commissions whose release date has passed.
    ///
    /// When the policy requires an active referred user and they are not,
    /// the commission waits in `awaiting_verification` and is re-checked on
    /// every run. Without an active policy the verification requirement is
    /// not applied.
    pub async fn release_due_commissions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ReleaseSummary, LedgerError> {
        let require_active = match self.active_config(false).await? {
            Some(config) => config.require_referred_active,
            None => false,
        };

        let mut summary = ReleaseSummary::default();
        for commission in self.store.list_releasable_commissions(now).await? {
            let verified =
                !require_active || self.directory.is_user_active(commission.referred_id).await?;
            let target = if verified {
                CommissionStatus::Available
            } else {
                CommissionStatus::AwaitingVerification
            };
            if target == commission.status {
                continue;
            }

            if self
                .store
                .transition_commission(commission.id, commission.status, target, now)
                .await?
                .is_none()
            {
                continue;
            }

            match target {
                CommissionStatus::Available => summary.released += 1,
                _ => summary.awaiting_verification += 1,
            }
            tracing::debug!(
                commission_id = %commission.id,
                from = %commission.status,
                to = %target,
                "Commission status changed"
            );
        }

        if summary != ReleaseSummary::default() {
            tracing::info!(
                released = summary.released,
                awaiting_verification = summary.awaiting_verification,
                "Commission release run completed"
            );
        }
        Ok(summary)
    }

    /// Voids a commission none of which has been withdrawn.
    pub async fn cancel_commission(&self, commission_id: Uuid) -> Result<Commission, LedgerError> {
        let commission = self
            .store
            .find_commission(commission_id)
            .await?
            .ok_or(LedgerError::NotFound("Commission"))?;

        let invalid = || LedgerError::InvalidTransition {
            from: commission.status.to_string(),
            to: CommissionStatus::Cancelled.to_string(),
        };
        // Paid-out money cannot be voided.
        if !commission.status.is_cancellable() || !commission.settled_amount.is_zero() {
            return Err(invalid());
        }

        let cancelled = self
            .store
            .transition_commission(
                commission_id,
                commission.status,
                CommissionStatus::Cancelled,
                Utc::now(),
            )
            .await?
            .ok_or_else(invalid)?;

        tracing::info!(
            commission_id = %cancelled.id,
            referrer_id = %cancelled.referrer_id,
            previous_status = %commission.status,
            "Commission cancelled"
        );
        Ok(cancelled)
    }

    /// A referrer's commissions, newest first.
    pub async fn list_commissions(
        &self,
        referrer_id: Uuid,
        page: &PageQuery,
    ) -> Result<Vec<Commission>, LedgerError> {
        let (limit, offset) = page.limit_offset();
        Ok(self
            .store
            .list_commissions(referrer_id, limit, offset)
            .await?)
    }
}
