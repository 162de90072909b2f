//! Referral config entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{CommissionType, ReferralConfig};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for commission type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "commission_type", rename_all = "snake_case")]
pub enum CommissionTypeDb {
    FirstPayment,
    Recurring,
    Fixed,
}

impl From<CommissionTypeDb> for CommissionType {
    fn from(value: CommissionTypeDb) -> Self {
        match value {
            CommissionTypeDb::FirstPayment => CommissionType::FirstPayment,
            CommissionTypeDb::Recurring => CommissionType::Recurring,
            CommissionTypeDb::Fixed => CommissionType::Fixed,
        }
    }
}

impl From<CommissionType> for CommissionTypeDb {
    fn from(value: CommissionType) -> Self {
        match value {
            CommissionType::FirstPayment => CommissionTypeDb::FirstPayment,
            CommissionType::Recurring => CommissionTypeDb::Recurring,
            CommissionType::Fixed => CommissionTypeDb::Fixed,
        }
    }
}

/// Database row mapping for the referral_configs table.
#[derive(Debug, Clone, FromRow)]
pub struct ReferralConfigEntity {
    pub id: Uuid,
    pub commission_percentage: Decimal,
    pub commission_type: CommissionTypeDb,
    pub fixed_commission_amount: Option<Decimal>,
    pub release_days: i32,
    pub require_referred_active: bool,
    pub min_withdrawal_amount: Decimal,
    pub payment_day: i16,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReferralConfigEntity> for ReferralConfig {
    fn from(entity: ReferralConfigEntity) -> Self {
        Self {
            id: entity.id,
            commission_percentage: entity.commission_percentage,
            commission_type: entity.commission_type.into(),
            fixed_commission_amount: entity.fixed_commission_amount,
            release_days: entity.release_days,
            require_referred_active: entity.require_referred_active,
            min_withdrawal_amount: entity.min_withdrawal_amount,
            payment_day: entity.payment_day,
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
