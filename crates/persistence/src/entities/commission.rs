//! Commission entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Commission, CommissionStatus, UserReferralBalance};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use super::CommissionTypeDb;

/// Database enum for commission status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "commission_status", rename_all = "snake_case")]
pub enum CommissionStatusDb {
    Pending,
    AwaitingVerification,
    Available,
    Withdrawn,
    Cancelled,
}

impl From<CommissionStatusDb> for CommissionStatus {
    fn from(value: CommissionStatusDb) -> Self {
        match value {
            CommissionStatusDb::Pending => CommissionStatus::Pending,
            CommissionStatusDb::AwaitingVerification => CommissionStatus::AwaitingVerification,
            CommissionStatusDb::Available => CommissionStatus::Available,
            CommissionStatusDb::Withdrawn => CommissionStatus::Withdrawn,
            CommissionStatusDb::Cancelled => CommissionStatus::Cancelled,
        }
    }
}

impl From<CommissionStatus> for CommissionStatusDb {
    fn from(value: CommissionStatus) -> Self {
        match value {
            CommissionStatus::Pending => CommissionStatusDb::Pending,
            CommissionStatus::AwaitingVerification => CommissionStatusDb::AwaitingVerification,
            CommissionStatus::Available => CommissionStatusDb::Available,
            CommissionStatus::Withdrawn => CommissionStatusDb::Withdrawn,
            CommissionStatus::Cancelled => CommissionStatusDb::Cancelled,
        }
    }
}

/// Database row mapping for the commissions table.
#[derive(Debug, Clone, FromRow)]
pub struct CommissionEntity {
    pub id: Uuid,
    pub referral_id: Uuid,
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
    pub payment_amount: Decimal,
    pub commission_amount: Decimal,
    pub commission_percentage: Decimal,
    pub commission_type: CommissionTypeDb,
    pub external_payment_ref: Option<String>,
    pub status: CommissionStatusDb,
    pub settled_amount: Decimal,
    pub payment_date: DateTime<Utc>,
    pub release_date: DateTime<Utc>,
    pub available_at: Option<DateTime<Utc>>,
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<CommissionEntity> for Commission {
    fn from(entity: CommissionEntity) -> Self {
        Self {
            id: entity.id,
            referral_id: entity.referral_id,
            referrer_id: entity.referrer_id,
            referred_id: entity.referred_id,
            payment_amount: entity.payment_amount,
            commission_amount: entity.commission_amount,
            commission_percentage: entity.commission_percentage,
            commission_type: entity.commission_type.into(),
            external_payment_ref: entity.external_payment_ref,
            status: entity.status.into(),
            settled_amount: entity.settled_amount,
            payment_date: entity.payment_date,
            release_date: entity.release_date,
            available_at: entity.available_at,
            withdrawn_at: entity.withdrawn_at,
            cancelled_at: entity.cancelled_at,
        }
    }
}

/// Aggregated balance row for a referrer.
#[derive(Debug, Clone, FromRow)]
pub struct BalanceEntity {
    pub available_balance: Decimal,
    pub pending_balance: Decimal,
    pub total_earned: Decimal,
    pub total_withdrawn: Decimal,
    pub total_referrals: i64,
}

impl From<BalanceEntity> for UserReferralBalance {
    fn from(entity: BalanceEntity) -> Self {
        Self {
            available_balance: entity.available_balance,
            pending_balance: entity.pending_balance,
            total_earned: entity.total_earned,
            total_withdrawn: entity.total_withdrawn,
            total_referrals: entity.total_referrals,
        }
    }
}
