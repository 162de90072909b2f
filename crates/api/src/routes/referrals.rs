//! Referral endpoint handlers for the authenticated user.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::record_referral_registered;
use domain::models::{
    Commission, PageQuery, ReferralItem, ReferralLinkResponse, RegisterReferralRequest,
    RegisterReferralResponse, UserReferralBalance,
};

use super::ledger_failure;

/// Response for referral listing.
#[derive(Debug, Serialize)]
pub struct ListReferralsResponse {
    pub referrals: Vec<ReferralItem>,
    pub page: i64,
    pub per_page: i64,
}

/// Response for commission listing.
#[derive(Debug, Serialize)]
pub struct ListCommissionsResponse {
    pub commissions: Vec<Commission>,
    pub page: i64,
    pub per_page: i64,
}

/// Attribute the caller's signup to a referral code.
///
/// POST /api/v1/referrals
pub async fn register_referral(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<RegisterReferralRequest>,
) -> Result<(StatusCode, Json<RegisterReferralResponse>), ApiError> {
    request.validate()?;

    let referral = state
        .ledger
        .register_referral(&request.referral_code, auth.user_id, request.utm)
        .await
        .map_err(ledger_failure("register_referral"))?;

    record_referral_registered();

    Ok((
        StatusCode::CREATED,
        Json(RegisterReferralResponse {
            id: referral.id,
            referrer_id: referral.referrer_id,
            status: referral.status,
            created_at: referral.created_at,
        }),
    ))
}

/// List users the caller referred.
///
/// GET /api/v1/referrals?page=1&per_page=20
pub async fn list_referrals(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(page): Query<PageQuery>,
) -> Result<Json<ListReferralsResponse>, ApiError> {
    let referrals = state.ledger.list_referrals(auth.user_id, &page).await?;
    let (per_page, _) = page.limit_offset();

    Ok(Json(ListReferralsResponse {
        referrals,
        page: page.page.max(1),
        per_page,
    }))
}

/// The caller's shareable referral link.
///
/// GET /api/v1/referrals/link
pub async fn referral_link(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<ReferralLinkResponse>, ApiError> {
    let link = state
        .ledger
        .referral_link(auth.user_id, &state.config.referral.link_base_url)
        .await?;
    Ok(Json(link))
}

/// GET /api/v1/referrals/balance
pub async fn get_balance(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<UserReferralBalance>, ApiError> {
    Ok(Json(state.ledger.get_balance(auth.user_id).await?))
}

/// Commissions earned by the caller, newest first.
///
/// GET /api/v1/referrals/commissions?page=1&per_page=20
pub async fn list_commissions(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(page): Query<PageQuery>,
) -> Result<Json<ListCommissionsResponse>, ApiError> {
    let commissions = state.ledger.list_commissions(auth.user_id, &page).await?;
    let (per_page, _) = page.limit_offset();

    Ok(Json(ListCommissionsResponse {
        commissions,
        page: page.page.max(1),
        per_page,
    }))
}
