//! Postgres-backed ledger stores.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use domain::models::{
    Commission, CommissionStatus, NewCommission, NewReferral, NewWithdrawalRequest, Referral,
    ReferralConfig, ReferralConfigInput, UserReferralBalance, WithdrawalRequest,
    WithdrawalStatus,
};
use domain::services::{
    plan_payout, LedgerStore, PayoutOutcome, ProfileDirectory, StoreError, UniqueConstraint,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repositories::{
    CommissionRepository, PayoutRow, ProfileRepository, ReferralConfigRepository, ReferralRepository,
    WithdrawalRequestRepository,
};

/// SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Maps a unique index name from the migrations to the guarantee it enforces.
fn unique_constraint(name: &str) -> Option<UniqueConstraint> {
    match name {
        "uq_referrals_referred" => Some(UniqueConstraint::Referral),
        "uq_commissions_first_payment" => Some(UniqueConstraint::FirstPaymentCommission),
        "uq_commissions_payment_ref" => Some(UniqueConstraint::PaymentReference),
        "uq_withdrawal_requests_pending" => Some(UniqueConstraint::PendingWithdrawal),
        "uq_referral_configs_active" => Some(UniqueConstraint::ActiveConfig),
        _ => None,
    }
}

/// Converts a database error, surfacing known unique violations.
pub fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            if let Some(constraint) = db_err.constraint().and_then(unique_constraint) {
                return StoreError::UniqueViolation(constraint);
            }
        }
    }
    tracing::error!(error = %err, "Ledger store query failed");
    StoreError::Database(err.to_string())
}

/// [`LedgerStore`] over the referral tables.
#[derive(Clone)]
pub struct PgLedgerStore {
    configs: ReferralConfigRepository,
    referrals: ReferralRepository,
    commissions: CommissionRepository,
    withdrawals: WithdrawalRequestRepository,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            configs: ReferralConfigRepository::new(pool.clone()),
            referrals: ReferralRepository::new(pool.clone()),
            commissions: CommissionRepository::new(pool.clone()),
            withdrawals: WithdrawalRequestRepository::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl LedgerStore for PgLedgerStore {
    async fn fetch_active_config(&self) -> Result<Option<ReferralConfig>, StoreError> {
        let config = self.configs.find_active().await.map_err(store_error)?;
        Ok(config.map(Into::into))
    }

    async fn replace_active_config(
        &self,
        input: &ReferralConfigInput,
        now: DateTime<Utc>,
    ) -> Result<ReferralConfig, StoreError> {
        let config = self
            .configs
            .replace_active(input, now)
            .await
            .map_err(store_error)?;
        Ok(config.into())
    }

    async fn deactivate_config(&self, now: DateTime<Utc>) -> Result<bool, StoreError> {
        self.configs.deactivate_active(now).await.map_err(store_error)
    }

    async fn find_referral_by_referred(
        &self,
        referred_id: Uuid,
    ) -> Result<Option<Referral>, StoreError> {
        let referral = self
            .referrals
            .find_by_referred(referred_id)
            .await
            .map_err(store_error)?;
        Ok(referral.map(Into::into))
    }

    async fn insert_referral(
        &self,
        referral: NewReferral,
        now: DateTime<Utc>,
    ) -> Result<Referral, StoreError> {
        let referral = self
            .referrals
            .create(&referral, now)
            .await
            .map_err(store_error)?;
        Ok(referral.into())
    }

    async fn list_referrals(
        &self,
        referrer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Referral>, StoreError> {
        let referrals = self
            .referrals
            .list_for_referrer(referrer_id, limit, offset)
            .await
            .map_err(store_error)?;
        Ok(referrals.into_iter().map(Into::into).collect())
    }

    async fn has_commission_for_referred(&self, referred_id: Uuid) -> Result<bool, StoreError> {
        self.commissions
            .exists_for_referred(referred_id)
            .await
            .map_err(store_error)
    }

    async fn insert_commission(
        &self,
        commission: NewCommission,
        now: DateTime<Utc>,
    ) -> Result<Commission, StoreError> {
        let commission = self
            .commissions
            .create_and_activate_referral(&commission, now)
            .await
            .map_err(store_error)?;
        Ok(commission.into())
    }

    async fn find_commission(&self, id: Uuid) -> Result<Option<Commission>, StoreError> {
        let commission = self.commissions.find_by_id(id).await.map_err(store_error)?;
        Ok(commission.map(Into::into))
    }

    async fn list_commissions(
        &self,
        referrer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Commission>, StoreError> {
        let commissions = self
            .commissions
            .list_for_referrer(referrer_id, limit, offset)
            .await
            .map_err(store_error)?;
        Ok(commissions.into_iter().map(Into::into).collect())
    }

    async fn list_releasable_commissions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Commission>, StoreError> {
        let commissions = self
            .commissions
            .list_releasable(now)
            .await
            .map_err(store_error)?;
        Ok(commissions.into_iter().map(Into::into).collect())
    }

    async fn transition_commission(
        &self,
        id: Uuid,
        from: CommissionStatus,
        to: CommissionStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Commission>, StoreError> {
        let commission = self
            .commissions
            .transition(id, from.into(), to.into(), now)
            .await
            .map_err(store_error)?;
        Ok(commission.map(Into::into))
    }

    async fn balance_for(&self, user_id: Uuid) -> Result<UserReferralBalance, StoreError> {
        let balance = self
            .commissions
            .balance_for(user_id)
            .await
            .map_err(store_error)?;
        Ok(balance.into())
    }

    async fn has_pending_withdrawal(&self, user_id: Uuid) -> Result<bool, StoreError> {
        self.withdrawals
            .has_pending(user_id)
            .await
            .map_err(store_error)
    }

    async fn insert_withdrawal(
        &self,
        request: NewWithdrawalRequest,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalRequest, StoreError> {
        let request = self
            .withdrawals
            .create(&request, now)
            .await
            .map_err(store_error)?;
        Ok(request.into())
    }

    async fn find_withdrawal(&self, id: Uuid) -> Result<Option<WithdrawalRequest>, StoreError> {
        let request = self.withdrawals.find_by_id(id).await.map_err(store_error)?;
        Ok(request.map(Into::into))
    }

    async fn list_withdrawals_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let requests = self
            .withdrawals
            .list_for_user(user_id, limit, offset)
            .await
            .map_err(store_error)?;
        Ok(requests.into_iter().map(Into::into).collect())
    }

    async fn list_withdrawals(
        &self,
        status: Option<WithdrawalStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let requests = self
            .withdrawals
            .list(status.map(Into::into), limit, offset)
            .await
            .map_err(store_error)?;
        Ok(requests.into_iter().map(Into::into).collect())
    }

    async fn transition_withdrawal(
        &self,
        id: Uuid,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
        rejection_reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<WithdrawalRequest>, StoreError> {
        let request = self
            .withdrawals
            .transition(id, from.into(), to.into(), rejection_reason.as_deref(), now)
            .await
            .map_err(store_error)?;
        Ok(request.map(Into::into))
    }

    async fn complete_payout(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PayoutOutcome, StoreError> {
        let row = self
            .withdrawals
            .complete_payout(id, now, |available, request| {
                let available: Vec<Commission> = available.into_iter().map(Into::into).collect();
                plan_payout(&available, request.amount)
            })
            .await
            .map_err(store_error)?;

        Ok(match row {
            PayoutRow::Paid(request, settlements) => PayoutOutcome::Paid {
                request: request.into(),
                settlements,
            },
            PayoutRow::NotApproved => PayoutOutcome::NotApproved,
            PayoutRow::Uncovered(available) => PayoutOutcome::Uncovered { available },
        })
    }
}

/// [`ProfileDirectory`] over the profiles table.
#[derive(Clone)]
pub struct PgProfileDirectory {
    profiles: ProfileRepository,
}

impl PgProfileDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            profiles: ProfileRepository::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl ProfileDirectory for PgProfileDirectory {
    async fn resolve_referral_code(&self, code: &str) -> Result<Option<Uuid>, StoreError> {
        self.profiles
            .find_id_by_slug(code)
            .await
            .map_err(store_error)
    }

    async fn referral_code_for(&self, user_id: Uuid) -> Result<Option<String>, StoreError> {
        self.profiles.find_slug(user_id).await.map_err(store_error)
    }

    async fn is_user_active(&self, user_id: Uuid) -> Result<bool, StoreError> {
        self.profiles.is_active(user_id).await.map_err(store_error)
    }

    async fn display_names(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, String>, StoreError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let names = self
            .profiles
            .display_names(user_ids)
            .await
            .map_err(store_error)?;
        Ok(names.into_iter().map(|p| (p.id, p.display_name)).collect())
    }
}
