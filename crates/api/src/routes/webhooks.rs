//! Payment gateway webhook.
//!
//! The gateway retries until it sees a 2xx, so outcomes that will never
//! change on retry (not referred, already recorded, program off) are
//! acknowledged with 200 and an `ignored` status instead of an error.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::SignedPayload;
use crate::middleware::metrics::{record_commission_registered, record_ledger_rejection};
use crate::middleware::RequestId;
use domain::models::{PaymentEventRequest, PaymentEventResponse};
use domain::services::LedgerError;

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaymentWebhookResponse {
    Recorded(PaymentEventResponse),
    Ignored { reason: &'static str },
}

/// Whether a failure is final for this payment event.
fn is_acknowledged(err: &LedgerError) -> bool {
    matches!(
        err,
        LedgerError::NoReferrer | LedgerError::DuplicateCommission | LedgerError::ProgramDisabled
    )
}

/// Record the commission owed for a referred user's payment.
///
/// POST /api/v1/webhooks/payments
pub async fn payment_received(
    State(state): State<AppState>,
    request_id: RequestId,
    SignedPayload(event): SignedPayload<PaymentEventRequest>,
) -> Result<(StatusCode, Json<PaymentWebhookResponse>), ApiError> {
    event.validate()?;

    let result = state
        .ledger
        .register_commission(
            event.referred_user_id,
            event.payment_amount,
            event.external_payment_ref.clone(),
        )
        .await;

    match result {
        Ok(commission) => {
            record_commission_registered(&commission.commission_type.to_string());
            info!(
                request_id = %request_id.0,
                commission_id = %commission.id,
                external_payment_ref = event.external_payment_ref.as_deref().unwrap_or(""),
                "Payment webhook recorded commission"
            );
            Ok((
                StatusCode::CREATED,
                Json(PaymentWebhookResponse::Recorded(PaymentEventResponse {
                    commission_id: commission.id,
                    commission_amount: commission.commission_amount,
                    release_date: commission.release_date,
                })),
            ))
        }
        Err(err) if is_acknowledged(&err) => {
            record_ledger_rejection("register_commission", err.code());
            info!(
                request_id = %request_id.0,
                referred_user_id = %event.referred_user_id,
                reason = err.code(),
                "Payment webhook ignored"
            );
            Ok((
                StatusCode::OK,
                Json(PaymentWebhookResponse::Ignored { reason: err.code() }),
            ))
        }
        Err(err) => Err(ApiError::Ledger(err)),
    }
}
