//! Admin commission handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AdminAuth;
use crate::middleware::metrics::record_commissions_released;
use domain::models::Commission;
use domain::services::ReleaseSummary;

use super::ledger_failure;

/// Void a commission, e.g. after a refund.
///
/// POST /api/v1/admin/commissions/:id/cancel
pub async fn cancel_commission(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Commission>, ApiError> {
    let commission = state
        .ledger
        .cancel_commission(id)
        .await
        .map_err(ledger_failure("cancel_commission"))?;

    info!(admin_id = %admin.user_id, commission_id = %id, "Commission cancelled by admin");
    Ok(Json(commission))
}

/// Run the release pass now instead of waiting for the scheduler.
///
/// POST /api/v1/admin/commissions/release
pub async fn release_due(
    State(state): State<AppState>,
    admin: AdminAuth,
) -> Result<Json<ReleaseSummary>, ApiError> {
    let summary = state.ledger.release_due_commissions(Utc::now()).await?;
    record_commissions_released(summary.released);

    info!(
        admin_id = %admin.user_id,
        released = summary.released,
        awaiting_verification = summary.awaiting_verification,
        "Manual commission release"
    );
    Ok(Json(summary))
}
