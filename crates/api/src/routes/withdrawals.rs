//! Withdrawal endpoint handlers for the authenticated user.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::record_withdrawal_requested;
use domain::models::{CreateWithdrawalRequest, PageQuery, WithdrawalEligibility, WithdrawalRequest};

use super::ledger_failure;

/// Response for withdrawal listing.
#[derive(Debug, Serialize)]
pub struct ListWithdrawalsResponse {
    pub withdrawals: Vec<WithdrawalRequest>,
    pub page: i64,
    pub per_page: i64,
}

/// Whether the caller may request a payout right now.
///
/// GET /api/v1/withdrawals/eligibility
pub async fn eligibility(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<WithdrawalEligibility>, ApiError> {
    Ok(Json(state.ledger.can_withdraw(auth.user_id).await?))
}

/// Request a payout of available commissions.
///
/// POST /api/v1/withdrawals
pub async fn request_withdrawal(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateWithdrawalRequest>,
) -> Result<(StatusCode, Json<WithdrawalRequest>), ApiError> {
    request.validate()?;

    let withdrawal = state
        .ledger
        .request_withdrawal(auth.user_id, request)
        .await
        .map_err(ledger_failure("request_withdrawal"))?;

    record_withdrawal_requested();
    info!(
        withdrawal_id = %withdrawal.id,
        jti = %auth.jti,
        "Withdrawal request accepted"
    );

    Ok((StatusCode::CREATED, Json(withdrawal)))
}

/// The caller's withdrawal history, newest first.
///
/// GET /api/v1/withdrawals?page=1&per_page=20
pub async fn list_withdrawals(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(page): Query<PageQuery>,
) -> Result<Json<ListWithdrawalsResponse>, ApiError> {
    let withdrawals = state.ledger.list_withdrawals(auth.user_id, &page).await?;
    let (per_page, _) = page.limit_offset();

    Ok(Json(ListWithdrawalsResponse {
        withdrawals,
        page: page.page.max(1),
        per_page,
    }))
}
