//! Admin referral program configuration handlers.

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AdminAuth;
use domain::models::{ReferralConfig, ReferralConfigInput};

/// Read the active commission policy, bypassing the cache.
///
/// GET /api/v1/admin/referral-config
pub async fn get_config(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<ReferralConfig>, ApiError> {
    let config = state
        .ledger
        .active_config(true)
        .await?
        .ok_or_else(|| ApiError::NotFound("No active referral config".to_string()))?;
    Ok(Json(config.as_ref().clone()))
}

/// Replace the active commission policy with a new version.
///
/// PUT /api/v1/admin/referral-config
pub async fn replace_config(
    State(state): State<AppState>,
    admin: AdminAuth,
    Json(input): Json<ReferralConfigInput>,
) -> Result<Json<ReferralConfig>, ApiError> {
    let config = state.ledger.replace_config(input).await?;

    info!(
        admin_id = %admin.user_id,
        config_id = %config.id,
        "Admin replaced referral config"
    );
    Ok(Json(config))
}

/// Deactivate the policy, stopping new commissions.
///
/// POST /api/v1/admin/referral-config/disable
pub async fn disable_program(
    State(state): State<AppState>,
    admin: AdminAuth,
) -> Result<StatusCode, ApiError> {
    state.ledger.disable_program().await?;

    info!(admin_id = %admin.user_id, "Admin disabled referral program");
    Ok(StatusCode::NO_CONTENT)
}
