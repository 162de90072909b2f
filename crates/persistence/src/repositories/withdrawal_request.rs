//! Withdrawal request repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::NewWithdrawalRequest;
use domain::services::PayoutSettlement;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{CommissionEntity, PixKeyTypeDb, WithdrawalRequestEntity, WithdrawalStatusDb};
use crate::metrics::QueryTimer;

/// Outcome of [`WithdrawalRequestRepository::complete_payout`].
#[derive(Debug)]
pub enum PayoutRow {
    Paid(WithdrawalRequestEntity, Vec<PayoutSettlement>),
    NotApproved,
    /// Unsettled total of the user's available commissions.
    Uncovered(Decimal),
}

/// Repository for withdrawal requests and payouts.
#[derive(Clone)]
pub struct WithdrawalRequestRepository {
    pool: PgPool,
}

impl WithdrawalRequestRepository {
    /// Creates a new WithdrawalRequestRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Whether the user has a pending request.
    pub async fn has_pending(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("has_pending_withdrawal");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM withdrawal_requests WHERE user_id = $1 AND status = 'pending'
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert a pending request. Violates `uq_withdrawal_requests_pending` if
    /// the user already has one.
    pub async fn create(
        &self,
        request: &NewWithdrawalRequest,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalRequestEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_withdrawal_request");
        let result = sqlx::query_as::<_, WithdrawalRequestEntity>(
            r#"
            INSERT INTO withdrawal_requests (
                user_id, amount, pix_key, pix_key_type, bank_name, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, 'pending', $6)
            RETURNING id, user_id, amount, pix_key, pix_key_type, bank_name, status,
                      rejection_reason, created_at, processed_at
            "#,
        )
        .bind(request.user_id)
        .bind(request.amount)
        .bind(&request.pix_key)
        .bind(PixKeyTypeDb::from(request.pix_key_type))
        .bind(request.bank_name.as_deref())
        .bind(now)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a request by ID.
    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<WithdrawalRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_withdrawal_request_by_id");
        let result = sqlx::query_as::<_, WithdrawalRequestEntity>(
            r#"
            SELECT id, user_id, amount, pix_key, pix_key_type, bank_name, status,
                   rejection_reason, created_at, processed_at
            FROM withdrawal_requests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List a user's requests, newest first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WithdrawalRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_withdrawal_requests_for_user");
        let result = sqlx::query_as::<_, WithdrawalRequestEntity>(
            r#"
            SELECT id, user_id, amount, pix_key, pix_key_type, bank_name, status,
                   rejection_reason, created_at, processed_at
            FROM withdrawal_requests
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List all requests, optionally filtered by status, newest first.
    pub async fn list(
        &self,
        status_filter: Option<WithdrawalStatusDb>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WithdrawalRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_withdrawal_requests");
        let result = if let Some(status) = status_filter {
            sqlx::query_as::<_, WithdrawalRequestEntity>(
                r#"
                SELECT id, user_id, amount, pix_key, pix_key_type, bank_name, status,
                       rejection_reason, created_at, processed_at
                FROM withdrawal_requests
                WHERE status = $1
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, WithdrawalRequestEntity>(
                r#"
                SELECT id, user_id, amount, pix_key, pix_key_type, bank_name, status,
                       rejection_reason, created_at, processed_at
                FROM withdrawal_requests
                ORDER BY created_at DESC
                LIMIT $1 OFFSET $2
                "#,
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        };
        timer.record();
        result
    }

    /// Compare-and-set a request's status.
    pub async fn transition(
        &self,
        id: Uuid,
        from: WithdrawalStatusDb,
        to: WithdrawalStatusDb,
        rejection_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<WithdrawalRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("transition_withdrawal_request");
        let result = sqlx::query_as::<_, WithdrawalRequestEntity>(
            r#"
            UPDATE withdrawal_requests
            SET status = $3, rejection_reason = $4, processed_at = $5
            WHERE id = $1 AND status = $2
            RETURNING id, user_id, amount, pix_key, pix_key_type, bank_name, status,
                      rejection_reason, created_at, processed_at
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(rejection_reason)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Mark an approved request paid and apply the commission settlements
    /// computed by `plan`, in one transaction.
    ///
    /// The request and the user's available commissions are locked for the
    /// duration. Nothing is written when `plan` finds the commissions do not
    /// cover the request.
    pub async fn complete_payout<F>(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        plan: F,
    ) -> Result<PayoutRow, sqlx::Error>
    where
        F: FnOnce(Vec<CommissionEntity>, &WithdrawalRequestEntity) -> Option<Vec<PayoutSettlement>>
            + Send,
    {
        let timer = QueryTimer::new("complete_withdrawal_payout");
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, WithdrawalRequestEntity>(
            r#"
            SELECT id, user_id, amount, pix_key, pix_key_type, bank_name, status,
                   rejection_reason, created_at, processed_at
            FROM withdrawal_requests
            WHERE id = $1 AND status = 'approved'
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(request) = request else {
            tx.rollback().await?;
            timer.record();
            return Ok(PayoutRow::NotApproved);
        };

        let available = sqlx::query_as::<_, CommissionEntity>(
            r#"
            SELECT id, referral_id, referrer_id, referred_id, payment_amount,
                   commission_amount, commission_percentage, commission_type,
                   external_payment_ref, status, settled_amount, payment_date, release_date,
                   available_at, withdrawn_at, cancelled_at
            FROM commissions
            WHERE referrer_id = $1 AND status = 'available'
            FOR UPDATE
            "#,
        )
        .bind(request.user_id)
        .fetch_all(&mut *tx)
        .await?;

        let unsettled: Decimal = available
            .iter()
            .map(|c| c.commission_amount - c.settled_amount)
            .sum();
        let Some(settlements) = plan(available, &request) else {
            tx.rollback().await?;
            timer.record();
            return Ok(PayoutRow::Uncovered(unsettled));
        };

        let ids: Vec<Uuid> = settlements.iter().map(|s| s.commission_id).collect();
        let amounts: Vec<Decimal> = settlements.iter().map(|s| s.settled_amount).collect();
        sqlx::query(
            r#"
            UPDATE commissions c
            SET settled_amount = s.settled_amount,
                status = CASE WHEN s.settled_amount = c.commission_amount
                              THEN 'withdrawn'::commission_status ELSE c.status END,
                withdrawn_at = CASE WHEN s.settled_amount = c.commission_amount
                                    THEN $3 ELSE c.withdrawn_at END
            FROM UNNEST($1::uuid[], $2::numeric[]) AS s(id, settled_amount)
            WHERE c.id = s.id
            "#,
        )
        .bind(&ids)
        .bind(&amounts)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let paid = sqlx::query_as::<_, WithdrawalRequestEntity>(
            r#"
            UPDATE withdrawal_requests
            SET status = 'paid', processed_at = $2
            WHERE id = $1
            RETURNING id, user_id, amount, pix_key, pix_key_type, bank_name, status,
                      rejection_reason, created_at, processed_at
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(PayoutRow::Paid(paid, settlements))
    }
}
