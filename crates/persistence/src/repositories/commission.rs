//! Commission repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::NewCommission;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{BalanceEntity, CommissionEntity, CommissionStatusDb, CommissionTypeDb};
use crate::metrics::QueryTimer;

/// Repository for commission rows and balance aggregation.
#[derive(Clone)]
pub struct CommissionRepository {
    pool: PgPool,
}

impl CommissionRepository {
    /// Creates a new CommissionRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Whether any commission exists for a referred user.
    pub async fn exists_for_referred(&self, referred_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("commission_exists_for_referred");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM commissions WHERE referred_id = $1)
            "#,
        )
        .bind(referred_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert a pending commission and activate its referral if still pending.
    pub async fn create_and_activate_referral(
        &self,
        commission: &NewCommission,
        now: DateTime<Utc>,
    ) -> Result<CommissionEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_commission");
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, CommissionEntity>(
            r#"
            INSERT INTO commissions (
                referral_id, referrer_id, referred_id, payment_amount, commission_amount,
                commission_percentage, commission_type, external_payment_ref, status,
                payment_date, release_date, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9, $10, $11)
            RETURNING id, referral_id, referrer_id, referred_id, payment_amount,
                      commission_amount, commission_percentage, commission_type,
                      external_payment_ref, status, settled_amount, payment_date, release_date,
                      available_at, withdrawn_at, cancelled_at
            "#,
        )
        .bind(commission.referral_id)
        .bind(commission.referrer_id)
        .bind(commission.referred_id)
        .bind(commission.payment_amount)
        .bind(commission.commission_amount)
        .bind(commission.commission_percentage)
        .bind(CommissionTypeDb::from(commission.commission_type))
        .bind(commission.external_payment_ref.as_deref())
        .bind(commission.payment_date)
        .bind(commission.release_date)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE referrals
            SET status = 'active', activated_at = $2
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(commission.referral_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(created)
    }

    /// Find a commission by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CommissionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_commission_by_id");
        let result = sqlx::query_as::<_, CommissionEntity>(
            r#"
            SELECT id, referral_id, referrer_id, referred_id, payment_amount,
                   commission_amount, commission_percentage, commission_type,
                   external_payment_ref, status, settled_amount, payment_date, release_date,
                   available_at, withdrawn_at, cancelled_at
            FROM commissions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List a referrer's commissions, newest payment first.
    pub async fn list_for_referrer(
        &self,
        referrer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommissionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_commissions_for_referrer");
        let result = sqlx::query_as::<_, CommissionEntity>(
            r#"
            SELECT id, referral_id, referrer_id, referred_id, payment_amount,
                   commission_amount, commission_percentage, commission_type,
                   external_payment_ref, status, settled_amount, payment_date, release_date,
                   available_at, withdrawn_at, cancelled_at
            FROM commissions
            WHERE referrer_id = $1
            ORDER BY payment_date DESC
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

    /// Pending commissions due at `now`, plus all awaiting verification.
    pub async fn list_releasable(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<CommissionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_releasable_commissions");
        let result = sqlx::query_as::<_, CommissionEntity>(
            r#"
            SELECT id, referral_id, referrer_id, referred_id, payment_amount,
                   commission_amount, commission_percentage, commission_type,
                   external_payment_ref, status, settled_amount, payment_date, release_date,
                   available_at, withdrawn_at, cancelled_at
            FROM commissions
            WHERE (status = 'pending' AND release_date <= $1)
               OR status = 'awaiting_verification'
            ORDER BY release_date ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Compare-and-set a commission's status, stamping the matching timestamp.
    ///
    /// A commission with a paid-out part is never cancelled.
    pub async fn transition(
        &self,
        id: Uuid,
        from: CommissionStatusDb,
        to: CommissionStatusDb,
        now: DateTime<Utc>,
    ) -> Result<Option<CommissionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("transition_commission");
        let result = sqlx::query_as::<_, CommissionEntity>(
            r#"
            UPDATE commissions
            SET status = $3,
                available_at = CASE WHEN $3 = 'available'::commission_status THEN $4 ELSE available_at END,
                withdrawn_at = CASE WHEN $3 = 'withdrawn'::commission_status THEN $4 ELSE withdrawn_at END,
                cancelled_at = CASE WHEN $3 = 'cancelled'::commission_status THEN $4 ELSE cancelled_at END
            WHERE id = $1 AND status = $2
              AND ($3 <> 'cancelled'::commission_status OR settled_amount = 0)
            RETURNING id, referral_id, referrer_id, referred_id, payment_amount,
                      commission_amount, commission_percentage, commission_type,
                      external_payment_ref, status, settled_amount, payment_date, release_date,
                      available_at, withdrawn_at, cancelled_at
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Aggregate a referrer's balance from commissions, withdrawals and
    /// referrals. Returns zeros for users without activity.
    ///
    /// The available balance counts only the unsettled part of available
    /// commissions and holds back approved requests not paid yet.
    pub async fn balance_for(&self, user_id: Uuid) -> Result<BalanceEntity, sqlx::Error> {
        let timer = QueryTimer::new("referral_balance");
        let result = sqlx::query_as::<_, BalanceEntity>(
            r#"
            SELECT
                GREATEST(
                    COALESCE(SUM(c.commission_amount - c.settled_amount)
                        FILTER (WHERE c.status = 'available'), 0)
                    - (SELECT COALESCE(SUM(w.amount), 0)
                       FROM withdrawal_requests w
                       WHERE w.user_id = $1 AND w.status = 'approved'),
                    0
                ) AS available_balance,
                COALESCE(SUM(c.commission_amount)
                    FILTER (WHERE c.status IN ('pending', 'awaiting_verification')), 0)
                    AS pending_balance,
                COALESCE(SUM(c.commission_amount) FILTER (WHERE c.status <> 'cancelled'), 0)
                    AS total_earned,
                (SELECT COALESCE(SUM(w.amount), 0)
                 FROM withdrawal_requests w
                 WHERE w.user_id = $1 AND w.status = 'paid') AS total_withdrawn,
                (SELECT COUNT(*) FROM referrals r WHERE r.referrer_id = $1) AS total_referrals
            FROM commissions c
            WHERE c.referrer_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}
