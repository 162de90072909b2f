//! Referral config repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::ReferralConfigInput;
use sqlx::PgPool;

use crate::entities::{CommissionTypeDb, ReferralConfigEntity};
use crate::metrics::QueryTimer;

/// Repository for the versioned commission policy.
#[derive(Clone)]
pub struct ReferralConfigRepository {
    pool: PgPool,
}

impl ReferralConfigRepository {
    /// Creates a new ReferralConfigRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the active policy.
    pub async fn find_active(&self) -> Result<Option<ReferralConfigEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_referral_config");
        let result = sqlx::query_as::<_, ReferralConfigEntity>(
            r#"
            SELECT id, commission_percentage, commission_type, fixed_commission_amount,
                   release_days, require_referred_active, min_withdrawal_amount,
                   payment_day, is_active, created_at, updated_at
            FROM referral_configs
            WHERE is_active = TRUE
            "#,
        )
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Deactivate the current policy and insert a new active version.
    pub async fn replace_active(
        &self,
        input: &ReferralConfigInput,
        now: DateTime<Utc>,
    ) -> Result<ReferralConfigEntity, sqlx::Error> {
        let timer = QueryTimer::new("replace_active_referral_config");
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE referral_configs
            SET is_active = FALSE, updated_at = $1
            WHERE is_active = TRUE
            "#,
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let config = sqlx::query_as::<_, ReferralConfigEntity>(
            r#"
            INSERT INTO referral_configs (
                commission_percentage, commission_type, fixed_commission_amount,
                release_days, require_referred_active, min_withdrawal_amount,
                payment_day, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, $8)
            RETURNING id, commission_percentage, commission_type, fixed_commission_amount,
                      release_days, require_referred_active, min_withdrawal_amount,
                      payment_day, is_active, created_at, updated_at
            "#,
        )
        .bind(input.commission_percentage)
        .bind(CommissionTypeDb::from(input.commission_type))
        .bind(input.fixed_commission_amount)
        .bind(input.release_days)
        .bind(input.require_referred_active)
        .bind(input.min_withdrawal_amount)
        .bind(input.payment_day)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(config)
    }

    /// Deactivate the active policy. Returns whether a row was deactivated.
    pub async fn deactivate_active(&self, now: DateTime<Utc>) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("deactivate_referral_config");
        let result = sqlx::query(
            r#"
            UPDATE referral_configs
            SET is_active = FALSE, updated_at = $1
            WHERE is_active = TRUE
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|r| r.rows_affected() > 0)
    }
}
