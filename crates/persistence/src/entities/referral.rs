//! Referral entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Referral, ReferralStatus, UtmMetadata};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for referral status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "referral_status", rename_all = "lowercase")]
pub enum ReferralStatusDb {
    Pending,
    Active,
    Cancelled,
}

impl From<ReferralStatusDb> for ReferralStatus {
    fn from(value: ReferralStatusDb) -> Self {
        match value {
            ReferralStatusDb::Pending => ReferralStatus::Pending,
            ReferralStatusDb::Active => ReferralStatus::Active,
            ReferralStatusDb::Cancelled => ReferralStatus::Cancelled,
        }
    }
}

/// Database row mapping for the referrals table.
#[derive(Debug, Clone, FromRow)]
pub struct ReferralEntity {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
    pub status: ReferralStatusDb,
    pub referral_code: String,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
}

impl From<ReferralEntity> for Referral {
    fn from(entity: ReferralEntity) -> Self {
        Self {
            id: entity.id,
            referrer_id: entity.referrer_id,
            referred_id: entity.referred_id,
            status: entity.status.into(),
            referral_code: entity.referral_code,
            utm: UtmMetadata {
                utm_source: entity.utm_source,
                utm_medium: entity.utm_medium,
                utm_campaign: entity.utm_campaign,
            },
            created_at: entity.created_at,
            activated_at: entity.activated_at,
        }
    }
}
