//! Admin withdrawal processing handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AdminAuth;
use domain::models::{ListWithdrawalsQuery, RejectWithdrawalRequest, WithdrawalRequest};

use super::ledger_failure;

/// Response for the admin withdrawal queue.
#[derive(Debug, Serialize)]
pub struct AdminWithdrawalsResponse {
    pub withdrawals: Vec<WithdrawalRequest>,
    pub page: i64,
    pub per_page: i64,
}

/// GET /api/v1/admin/withdrawals?status=pending&page=1&per_page=20
pub async fn list_withdrawals(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Query(query): Query<ListWithdrawalsQuery>,
) -> Result<Json<AdminWithdrawalsResponse>, ApiError> {
    let withdrawals = state.ledger.list_all_withdrawals(&query).await?;
    let (per_page, _) = query.limit_offset();

    Ok(Json(AdminWithdrawalsResponse {
        withdrawals,
        page: query.page.max(1),
        per_page,
    }))
}

/// POST /api/v1/admin/withdrawals/:id/approve
pub async fn approve_withdrawal(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<WithdrawalRequest>, ApiError> {
    let withdrawal = state
        .ledger
        .approve_withdrawal(id)
        .await
        .map_err(ledger_failure("approve_withdrawal"))?;

    info!(admin_id = %admin.user_id, withdrawal_id = %id, "Withdrawal approved");
    Ok(Json(withdrawal))
}

/// POST /api/v1/admin/withdrawals/:id/reject
pub async fn reject_withdrawal(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<RejectWithdrawalRequest>,
) -> Result<Json<WithdrawalRequest>, ApiError> {
    request.validate()?;

    let withdrawal = state
        .ledger
        .reject_withdrawal(id, request.reason)
        .await
        .map_err(ledger_failure("reject_withdrawal"))?;

    info!(admin_id = %admin.user_id, withdrawal_id = %id, "Withdrawal rejected");
    Ok(Json(withdrawal))
}

/// Mark an approved request paid, settling the commissions it covers.
///
/// POST /api/v1/admin/withdrawals/:id/pay
pub async fn pay_withdrawal(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<WithdrawalRequest>, ApiError> {
    let withdrawal = state
        .ledger
        .pay_withdrawal(id)
        .await
        .map_err(ledger_failure("pay_withdrawal"))?;

    info!(
        admin_id = %admin.user_id,
        withdrawal_id = %id,
        amount = %withdrawal.amount,
        "Withdrawal paid"
    );
    Ok(Json(withdrawal))
}
