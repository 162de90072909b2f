//! Referral repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::NewReferral;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::ReferralEntity;
use crate::metrics::QueryTimer;

/// Repository for referral attribution rows.
#[derive(Clone)]
pub struct ReferralRepository {
    pool: PgPool,
}

impl ReferralRepository {
    /// Creates a new ReferralRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the referral of a referred user.
    pub async fn find_by_referred(
        &self,
        referred_id: Uuid,
    ) -> Result<Option<ReferralEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_referral_by_referred");
        let result = sqlx::query_as::<_, ReferralEntity>(
            r#"
            SELECT id, referrer_id, referred_id, status, referral_code,
                   utm_source, utm_medium, utm_campaign, created_at, activated_at
            FROM referrals
            WHERE referred_id = $1
            "#,
        )
        .bind(referred_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert a pending referral. Violates `uq_referrals_referred` if the
    /// referred user already has one.
    pub async fn create(
        &self,
        referral: &NewReferral,
        now: DateTime<Utc>,
    ) -> Result<ReferralEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_referral");
        let result = sqlx::query_as::<_, ReferralEntity>(
            r#"
            INSERT INTO referrals (
                referrer_id, referred_id, status, referral_code,
                utm_source, utm_medium, utm_campaign, created_at
            )
            VALUES ($1, $2, 'pending', $3, $4, $5, $6, $7)
            RETURNING id, referrer_id, referred_id, status, referral_code,
                      utm_source, utm_medium, utm_campaign, created_at, activated_at
            "#,
        )
        .bind(referral.referrer_id)
        .bind(referral.referred_id)
        .bind(&referral.referral_code)
        .bind(referral.utm.utm_source.as_deref())
        .bind(referral.utm.utm_medium.as_deref())
        .bind(referral.utm.utm_campaign.as_deref())
        .bind(now)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List a referrer's referrals, newest first.
    pub async fn list_for_referrer(
        &self,
        referrer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReferralEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_referrals_for_referrer");
        let result = sqlx::query_as::<_, ReferralEntity>(
            r#"
            SELECT id, referrer_id, referred_id, status, referral_code,
                   utm_source, utm_medium, utm_campaign, created_at, activated_at
            FROM referrals
            WHERE referrer_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(referrer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
