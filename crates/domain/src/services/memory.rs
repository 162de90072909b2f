//! In-memory implementations of the ledger stores.
//!
//! Used by tests and local development. Every uniqueness guarantee of the
//! Postgres schema is checked and applied under a single lock, so concurrent
//! callers observe the same violations they would against the database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    Commission, CommissionStatus, CommissionType, NewCommission, NewReferral,
    NewWithdrawalRequest, Referral, ReferralConfig, ReferralConfigInput, ReferralStatus,
    UserReferralBalance, WithdrawalRequest, WithdrawalStatus,
};

use super::error::{StoreError, UniqueConstraint};
use super::store::{LedgerStore, PayoutOutcome, ProfileDirectory};
use super::withdrawal::plan_payout;

#[derive(Debug, Default)]
struct MemoryState {
    configs: Vec<ReferralConfig>,
    referrals: Vec<Referral>,
    commissions: Vec<Commission>,
    withdrawals: Vec<WithdrawalRequest>,
}

impl MemoryState {
    fn active_config_mut(&mut self) -> Option<&mut ReferralConfig> {
        self.configs.iter_mut().find(|c| c.is_active)
    }
}

/// Ledger store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: Mutex<MemoryState>,
    config_unavailable: AtomicBool,
    config_fetches: AtomicUsize,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an active policy.
    pub fn with_config(mut config: ReferralConfig) -> Self {
        config.is_active = true;
        let store = Self::default();
        store.lock().configs.push(config);
        store
    }

    /// Edits the active policy in place, bypassing versioning.
    pub fn set_active_percentage(&self, percentage: Decimal) {
        if let Some(config) = self.lock().active_config_mut() {
            config.commission_percentage = percentage;
        }
    }

    /// Makes policy reads fail, as if the database were unreachable.
    pub fn set_config_unavailable(&self, unavailable: bool) {
        self.config_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of policy reads served so far.
    pub fn config_fetches(&self) -> usize {
        self.config_fetches.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn newest_first<T, F>(mut items: Vec<T>, created_at: F, limit: i64, offset: i64) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait::async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn fetch_active_config(&self) -> Result<Option<ReferralConfig>, StoreError> {
        self.config_fetches.fetch_add(1, Ordering::SeqCst);
        if self.config_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database("config store unavailable".into()));
        }
        Ok(self.lock().configs.iter().find(|c| c.is_active).cloned())
    }

    async fn replace_active_config(
        &self,
        input: &ReferralConfigInput,
        now: DateTime<Utc>,
    ) -> Result<ReferralConfig, StoreError> {
        let mut state = self.lock();
        if let Some(previous) = state.active_config_mut() {
            previous.is_active = false;
            previous.updated_at = now;
        }
        let config = ReferralConfig {
            id: Uuid::new_v4(),
            commission_percentage: input.commission_percentage,
            commission_type: input.commission_type,
            fixed_commission_amount: input.fixed_commission_amount,
            release_days: input.release_days,
            require_referred_active: input.require_referred_active,
            min_withdrawal_amount: input.min_withdrawal_amount,
            payment_day: input.payment_day,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.configs.push(config.clone());
        Ok(config)
    }

    async fn deactivate_config(&self, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut state = self.lock();
        match state.active_config_mut() {
            Some(config) => {
                config.is_active = false;
                config.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_referral_by_referred(
        &self,
        referred_id: Uuid,
    ) -> Result<Option<Referral>, StoreError> {
        Ok(self
            .lock()
            .referrals
            .iter()
            .find(|r| r.referred_id == referred_id)
            .cloned())
    }

    async fn insert_referral(
        &self,
        referral: NewReferral,
        now: DateTime<Utc>,
    ) -> Result<Referral, StoreError> {
        let mut state = self.lock();
        if state
            .referrals
            .iter()
            .any(|r| r.referred_id == referral.referred_id)
        {
            return Err(StoreError::UniqueViolation(UniqueConstraint::Referral));
        }
        let referral = Referral {
            id: Uuid::new_v4(),
            referrer_id: referral.referrer_id,
            referred_id: referral.referred_id,
            status: ReferralStatus::Pending,
            referral_code: referral.referral_code,
            utm: referral.utm,
            created_at: now,
            activated_at: None,
        };
        state.referrals.push(referral.clone());
        Ok(referral)
    }

    async fn list_referrals(
        &self,
        referrer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Referral>, StoreError> {
        let referrals = self
            .lock()
            .referrals
            .iter()
            .filter(|r| r.referrer_id == referrer_id)
            .cloned()
            .collect();
        Ok(newest_first(referrals, |r| r.created_at, limit, offset))
    }

    async fn has_commission_for_referred(&self, referred_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .commissions
            .iter()
            .any(|c| c.referred_id == referred_id))
    }

    async fn insert_commission(
        &self,
        commission: NewCommission,
        now: DateTime<Utc>,
    ) -> Result<Commission, StoreError> {
        let mut state = self.lock();
        if commission.commission_type == CommissionType::FirstPayment
            && state.commissions.iter().any(|c| {
                c.referred_id == commission.referred_id
                    && c.commission_type == CommissionType::FirstPayment
            })
        {
            return Err(StoreError::UniqueViolation(
                UniqueConstraint::FirstPaymentCommission,
            ));
        }
        if let Some(reference) = &commission.external_payment_ref {
            if state
                .commissions
                .iter()
                .any(|c| c.external_payment_ref.as_ref() == Some(reference))
            {
                return Err(StoreError::UniqueViolation(UniqueConstraint::PaymentReference));
            }
        }

        let commission = Commission {
            id: Uuid::new_v4(),
            referral_id: commission.referral_id,
            referrer_id: commission.referrer_id,
            referred_id: commission.referred_id,
            payment_amount: commission.payment_amount,
            commission_amount: commission.commission_amount,
            commission_percentage: commission.commission_percentage,
            commission_type: commission.commission_type,
            external_payment_ref: commission.external_payment_ref,
            status: CommissionStatus::Pending,
            settled_amount: Decimal::ZERO,
            payment_date: commission.payment_date,
            release_date: commission.release_date,
            available_at: None,
            withdrawn_at: None,
            cancelled_at: None,
        };

        if let Some(referral) = state
            .referrals
            .iter_mut()
            .find(|r| r.id == commission.referral_id && r.status == ReferralStatus::Pending)
        {
            referral.status = ReferralStatus::Active;
            referral.activated_at = Some(now);
        }
        state.commissions.push(commission.clone());
        Ok(commission)
    }

    async fn find_commission(&self, id: Uuid) -> Result<Option<Commission>, StoreError> {
        Ok(self.lock().commissions.iter().find(|c| c.id == id).cloned())
    }

    async fn list_commissions(
        &self,
        referrer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Commission>, StoreError> {
        let commissions = self
            .lock()
            .commissions
            .iter()
            .filter(|c| c.referrer_id == referrer_id)
            .cloned()
            .collect();
        Ok(newest_first(commissions, |c| c.payment_date, limit, offset))
    }

    async fn list_releasable_commissions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Commission>, StoreError> {
        let mut due: Vec<Commission> = self
            .lock()
            .commissions
            .iter()
            .filter(|c| match c.status {
                CommissionStatus::Pending => c.release_date <= now,
                CommissionStatus::AwaitingVerification => true,
                _ => false,
            })
            .cloned()
            .collect();
        due.sort_by_key(|c| c.release_date);
        Ok(due)
    }

    async fn transition_commission(
        &self,
        id: Uuid,
        from: CommissionStatus,
        to: CommissionStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Commission>, StoreError> {
        let mut state = self.lock();
        let Some(commission) = state.commissions.iter_mut().find(|c| {
            c.id == id
                && c.status == from
                && (to != CommissionStatus::Cancelled || c.settled_amount.is_zero())
        }) else {
            return Ok(None);
        };
        commission.status = to;
        match to {
            CommissionStatus::Available => commission.available_at = Some(now),
            CommissionStatus::Withdrawn => commission.withdrawn_at = Some(now),
            CommissionStatus::Cancelled => commission.cancelled_at = Some(now),
            CommissionStatus::Pending | CommissionStatus::AwaitingVerification => {}
        }
        Ok(Some(commission.clone()))
    }

    async fn balance_for(&self, user_id: Uuid) -> Result<UserReferralBalance, StoreError> {
        let state = self.lock();
        let commissions: Vec<Commission> = state
            .commissions
            .iter()
            .filter(|c| c.referrer_id == user_id)
            .cloned()
            .collect();
        let withdrawals: Vec<WithdrawalRequest> = state
            .withdrawals
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        let total_referrals = state
            .referrals
            .iter()
            .filter(|r| r.referrer_id == user_id)
            .count() as i64;
        Ok(UserReferralBalance::from_records(
            &commissions,
            &withdrawals,
            total_referrals,
        ))
    }

    async fn has_pending_withdrawal(&self, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .withdrawals
            .iter()
            .any(|w| w.user_id == user_id && w.status == WithdrawalStatus::Pending))
    }

    async fn insert_withdrawal(
        &self,
        request: NewWithdrawalRequest,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalRequest, StoreError> {
        let mut state = self.lock();
        if state
            .withdrawals
            .iter()
            .any(|w| w.user_id == request.user_id && w.status == WithdrawalStatus::Pending)
        {
            return Err(StoreError::UniqueViolation(UniqueConstraint::PendingWithdrawal));
        }
        let request = WithdrawalRequest {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            amount: request.amount,
            pix_key: request.pix_key,
            pix_key_type: request.pix_key_type,
            bank_name: request.bank_name,
            status: WithdrawalStatus::Pending,
            rejection_reason: None,
            created_at: now,
            processed_at: None,
        };
        state.withdrawals.push(request.clone());
        Ok(request)
    }

    async fn find_withdrawal(&self, id: Uuid) -> Result<Option<WithdrawalRequest>, StoreError> {
        Ok(self.lock().withdrawals.iter().find(|w| w.id == id).cloned())
    }

    async fn list_withdrawals_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let requests = self
            .lock()
            .withdrawals
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(requests, |w| w.created_at, limit, offset))
    }

    async fn list_withdrawals(
        &self,
        status: Option<WithdrawalStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let requests = self
            .lock()
            .withdrawals
            .iter()
            .filter(|w| status.map_or(true, |s| w.status == s))
            .cloned()
            .collect();
        Ok(newest_first(requests, |w| w.created_at, limit, offset))
    }

    async fn transition_withdrawal(
        &self,
        id: Uuid,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
        rejection_reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<WithdrawalRequest>, StoreError> {
        let mut state = self.lock();
        let Some(request) = state
            .withdrawals
            .iter_mut()
            .find(|w| w.id == id && w.status == from)
        else {
            return Ok(None);
        };
        request.status = to;
        request.rejection_reason = rejection_reason;
        request.processed_at = Some(now);
        Ok(Some(request.clone()))
    }

    async fn complete_payout(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PayoutOutcome, StoreError> {
        let mut state = self.lock();
        let Some(index) = state
            .withdrawals
            .iter()
            .position(|w| w.id == id && w.status == WithdrawalStatus::Approved)
        else {
            return Ok(PayoutOutcome::NotApproved);
        };
        let user_id = state.withdrawals[index].user_id;
        let amount = state.withdrawals[index].amount;

        let available: Vec<Commission> = state
            .commissions
            .iter()
            .filter(|c| c.referrer_id == user_id && c.status == CommissionStatus::Available)
            .cloned()
            .collect();
        let Some(settlements) = plan_payout(&available, amount) else {
            return Ok(PayoutOutcome::Uncovered {
                available: available.iter().map(Commission::unsettled_amount).sum(),
            });
        };

        for settlement in &settlements {
            if let Some(commission) = state
                .commissions
                .iter_mut()
                .find(|c| c.id == settlement.commission_id)
            {
                commission.settled_amount = settlement.settled_amount;
                if settlement.fully_settled {
                    commission.status = CommissionStatus::Withdrawn;
                    commission.withdrawn_at = Some(now);
                }
            }
        }

        let request = &mut state.withdrawals[index];
        request.status = WithdrawalStatus::Paid;
        request.processed_at = Some(now);
        Ok(PayoutOutcome::Paid {
            request: request.clone(),
            settlements,
        })
    }
}

#[derive(Debug, Clone)]
struct Profile {
    slug: String,
    display_name: String,
    is_active: bool,
}

/// Profile directory backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryProfileDirectory {
    profiles: Mutex<HashMap<Uuid, Profile>>,
}

impl InMemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an active profile.
    pub fn add_profile(&self, user_id: Uuid, slug: &str, display_name: &str) {
        self.lock().insert(
            user_id,
            Profile {
                slug: slug.to_lowercase(),
                display_name: display_name.to_string(),
                is_active: true,
            },
        );
    }

    pub fn set_active(&self, user_id: Uuid, is_active: bool) {
        if let Some(profile) = self.lock().get_mut(&user_id) {
            profile.is_active = is_active;
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Profile>> {
        self.profiles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl ProfileDirectory for InMemoryProfileDirectory {
    async fn resolve_referral_code(&self, code: &str) -> Result<Option<Uuid>, StoreError> {
        let code = code.to_lowercase();
        Ok(self
            .lock()
            .iter()
            .find(|(_, profile)| profile.slug == code)
            .map(|(id, _)| *id))
    }

    async fn referral_code_for(&self, user_id: Uuid) -> Result<Option<String>, StoreError> {
        Ok(self.lock().get(&user_id).map(|p| p.slug.clone()))
    }

    async fn is_user_active(&self, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock().get(&user_id).is_some_and(|p| p.is_active))
    }

    async fn display_names(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, String>, StoreError> {
        let profiles = self.lock();
        Ok(user_ids
            .iter()
            .filter_map(|id| profiles.get(id).map(|p| (*id, p.display_name.clone())))
            .collect())
    }
}
