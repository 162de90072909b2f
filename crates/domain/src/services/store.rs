//! Storage seams for the ledger.
//!
//! The store must enforce the ledger's uniqueness guarantees itself and report
//! a violated guarantee as [`StoreError::UniqueViolation`]; the services never
//! rely on a prior read alone.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    Commission, CommissionStatus, NewCommission, NewReferral, NewWithdrawalRequest, Referral,
    ReferralConfig, ReferralConfigInput, UserReferralBalance, WithdrawalRequest,
    WithdrawalStatus,
};

use super::error::StoreError;
use super::withdrawal::PayoutSettlement;

/// Result of settling an approved withdrawal request.
#[derive(Debug, Clone)]
pub enum PayoutOutcome {
    Paid {
        request: WithdrawalRequest,
        settlements: Vec<PayoutSettlement>,
    },
    /// The request was not approved anymore.
    NotApproved,
    /// The user's available commissions no longer cover the request; nothing
    /// was changed.
    Uncovered { available: Decimal },
}

/// Persistence of referrals, commissions, withdrawals and the commission policy.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// The single active policy, if any.
    async fn fetch_active_config(&self) -> Result<Option<ReferralConfig>, StoreError>;

    /// Inserts a new active policy and deactivates the previous one atomically.
    async fn replace_active_config(
        &self,
        input: &ReferralConfigInput,
        now: DateTime<Utc>,
    ) -> Result<ReferralConfig, StoreError>;

    /// Deactivates the active policy. Returns `false` if none was active.
    async fn deactivate_config(&self, now: DateTime<Utc>) -> Result<bool, StoreError>;

    async fn find_referral_by_referred(
        &self,
        referred_id: Uuid,
    ) -> Result<Option<Referral>, StoreError>;

    /// Fails with [`UniqueConstraint::Referral`](super::UniqueConstraint::Referral)
    /// if the referred user already has a referral.
    async fn insert_referral(
        &self,
        referral: NewReferral,
        now: DateTime<Utc>,
    ) -> Result<Referral, StoreError>;

    async fn list_referrals(
        &self,
        referrer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Referral>, StoreError>;

    async fn has_commission_for_referred(&self, referred_id: Uuid) -> Result<bool, StoreError>;

    /// Inserts the commission and, in the same transaction, activates the
    /// owning referral if it is still pending.
    async fn insert_commission(
        &self,
        commission: NewCommission,
        now: DateTime<Utc>,
    ) -> Result<Commission, StoreError>;

    async fn find_commission(&self, id: Uuid) -> Result<Option<Commission>, StoreError>;

    async fn list_commissions(
        &self,
        referrer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Commission>, StoreError>;

    /// Pending commissions whose release date has passed, plus every commission
    /// awaiting verification.
    async fn list_releasable_commissions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Commission>, StoreError>;

    /// Moves a commission from `from` to `to`. Returns `None` if the commission
    /// was not in `from` anymore, or if `to` is `cancelled` and part of the
    /// commission has been paid out.
    async fn transition_commission(
        &self,
        id: Uuid,
        from: CommissionStatus,
        to: CommissionStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Commission>, StoreError>;

    async fn balance_for(&self, user_id: Uuid) -> Result<UserReferralBalance, StoreError>;

    async fn has_pending_withdrawal(&self, user_id: Uuid) -> Result<bool, StoreError>;

    /// Fails with
    /// [`UniqueConstraint::PendingWithdrawal`](super::UniqueConstraint::PendingWithdrawal)
    /// if the user already has a pending request.
    async fn insert_withdrawal(
        &self,
        request: NewWithdrawalRequest,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalRequest, StoreError>;

    async fn find_withdrawal(&self, id: Uuid) -> Result<Option<WithdrawalRequest>, StoreError>;

    async fn list_withdrawals_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WithdrawalRequest>, StoreError>;

    async fn list_withdrawals(
        &self,
        status: Option<WithdrawalStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WithdrawalRequest>, StoreError>;

    /// Moves a request from `from` to `to`. Returns `None` if the request was
    /// not in `from` anymore.
    async fn transition_withdrawal(
        &self,
        id: Uuid,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
        rejection_reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<WithdrawalRequest>, StoreError>;

    /// Marks an approved request paid and applies the settlements computed by
    /// [`plan_payout`] over the user's available commissions, atomically.
    ///
    /// [`plan_payout`]: super::plan_payout
    async fn complete_payout(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PayoutOutcome, StoreError>;
}

/// Read access to user profiles owned by another service.
#[async_trait::async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Resolves a referral code (profile slug) to its owner.
    async fn resolve_referral_code(&self, code: &str) -> Result<Option<Uuid>, StoreError>;

    /// The referral code (slug) of a user.
    async fn referral_code_for(&self, user_id: Uuid) -> Result<Option<String>, StoreError>;

    async fn is_user_active(&self, user_id: Uuid) -> Result<bool, StoreError>;

    async fn display_names(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, String>, StoreError>;
}
