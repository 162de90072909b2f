use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::services::LedgerError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {} invalid field(s)", .0.len())]
    InvalidFields(Vec<ValidationDetail>),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

/// HTTP status for a ledger failure.
pub fn ledger_status(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::AlreadyReferred
        | LedgerError::DuplicateCommission
        | LedgerError::PendingRequestExists
        | LedgerError::InvalidTransition { .. } => StatusCode::CONFLICT,
        LedgerError::InvalidCode
        | LedgerError::SelfReferral
        | LedgerError::NoReferrer
        | LedgerError::ProgramDisabled
        | LedgerError::BelowMinimum { .. }
        | LedgerError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::InvalidAmount | LedgerError::InvalidPixKey(_) | LedgerError::InvalidInput(_) => {
            StatusCode::BAD_REQUEST
        }
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::SystemUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut details = None;
        let (status, error_code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::InvalidFields(fields) => {
                let message = match fields.as_slice() {
                    [only] => only.message.clone(),
                    _ => format!("{} validation errors", fields.len()),
                };
                details = Some(fields);
                (StatusCode::BAD_REQUEST, "validation_error", message)
            }
            ApiError::Ledger(LedgerError::Store(err)) => {
                tracing::error!(error = %err, "Ledger store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::Ledger(err) => (ledger_status(&err), err.code(), err.to_string()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();

        // Nested struct errors are not reported per field.
        if details.is_empty() {
            return ApiError::Validation(errors.to_string());
        }
        ApiError::InvalidFields(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::PixKeyType;
    use domain::services::StoreError;
    use rust_decimal::Decimal;
    use validator::Validate;

    #[test]
    fn test_api_error_unauthorized() {
        let error = ApiError::Unauthorized("test message".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_api_error_forbidden() {
        let error = ApiError::Forbidden("access denied".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_api_error_validation() {
        let error = ApiError::Validation("invalid input".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_api_error_internal() {
        let error = ApiError::Internal("database connection failed".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_ledger_conflicts() {
        for err in [
            LedgerError::AlreadyReferred,
            LedgerError::DuplicateCommission,
            LedgerError::PendingRequestExists,
            LedgerError::InvalidTransition {
                from: "paid".into(),
                to: "rejected".into(),
            },
        ] {
            assert_eq!(ledger_status(&err), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn test_ledger_business_rule_failures() {
        for err in [
            LedgerError::InvalidCode,
            LedgerError::SelfReferral,
            LedgerError::NoReferrer,
            LedgerError::ProgramDisabled,
            LedgerError::BelowMinimum {
                minimum: Decimal::from(250),
            },
            LedgerError::InsufficientBalance {
                available: Decimal::ZERO,
            },
        ] {
            assert_eq!(ledger_status(&err), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn test_ledger_input_and_availability_failures() {
        assert_eq!(
            ledger_status(&LedgerError::InvalidPixKey(PixKeyType::Cpf)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ledger_status(&LedgerError::InvalidAmount),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ledger_status(&LedgerError::NotFound("Withdrawal request")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ledger_status(&LedgerError::SystemUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_store_failure_is_internal() {
        let error = ApiError::from(LedgerError::Store(StoreError::Database(
            "connection reset".into(),
        )));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_ledger_error_response_status() {
        let response = ApiError::from(LedgerError::SelfReferral).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
    }

    #[test]
    fn test_from_validation_errors() {
        let errors = Sample {
            name: String::new(),
        }
        .validate()
        .unwrap_err();

        match ApiError::from(errors) {
            ApiError::InvalidFields(details) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "name");
                assert_eq!(details[0].message, "name is required");
            }
            other => panic!("Expected InvalidFields, got {:?}", other),
        }
    }

    #[test]
    fn test_api_error_display() {
        assert_eq!(
            format!("{}", ApiError::Unauthorized("test".to_string())),
            "Unauthorized: test"
        );
        assert_eq!(
            format!("{}", ApiError::Ledger(LedgerError::NoReferrer)),
            "User was not referred"
        );
    }
}
