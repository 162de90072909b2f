//! Commission models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::validation::validate_money_amount;
use uuid::Uuid;
use validator::Validate;

use super::referral_config::CommissionType;

/// Lifecycle of a commission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    /// Recorded, waiting for its release date.
    Pending,
    /// Release date passed but the referred user is not active yet.
    AwaitingVerification,
    /// Can be withdrawn.
    Available,
    /// Settled by a paid withdrawal.
    Withdrawn,
    /// Voided (refund, chargeback, fraud).
    Cancelled,
}

impl CommissionStatus {
    /// Counted in the pending balance.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            CommissionStatus::Pending | CommissionStatus::AwaitingVerification
        )
    }

    /// Whether an administrator may cancel a commission in this state.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            CommissionStatus::Pending
                | CommissionStatus::AwaitingVerification
                | CommissionStatus::Available
        )
    }
}

impl std::fmt::Display for CommissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommissionStatus::Pending => write!(f, "pending"),
            CommissionStatus::AwaitingVerification => write!(f, "awaiting_verification"),
            CommissionStatus::Available => write!(f, "available"),
            CommissionStatus::Withdrawn => write!(f, "withdrawn"),
            CommissionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A commission owed to a referrer for one payment of a referred user.
///
/// `commission_amount` and `commission_percentage` are snapshots taken at
/// creation and never recomputed. `settled_amount` is the part already paid
/// out; a payout that covers only part of an available commission leaves it
/// available with the rest still withdrawable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Commission {
    pub id: Uuid,
    pub referral_id: Uuid,
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
    pub payment_amount: Decimal,
    pub commission_amount: Decimal,
    pub commission_percentage: Decimal,
    pub commission_type: CommissionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_payment_ref: Option<String>,
    pub status: CommissionStatus,
    pub settled_amount: Decimal,
    pub payment_date: DateTime<Utc>,
    pub release_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawn_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Commission {
    /// Amount not yet paid out.
    pub fn unsettled_amount(&self) -> Decimal {
        self.commission_amount - self.settled_amount
    }
}

/// Data needed to insert a commission.
#[derive(Debug, Clone)]
pub struct NewCommission {
    pub referral_id: Uuid,
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
    pub payment_amount: Decimal,
    pub commission_amount: Decimal,
    pub commission_percentage: Decimal,
    pub commission_type: CommissionType,
    pub external_payment_ref: Option<String>,
    pub payment_date: DateTime<Utc>,
    pub release_date: DateTime<Utc>,
}

/// Payment webhook body.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct PaymentEventRequest {
    pub referred_user_id: Uuid,

    #[validate(custom(function = "validate_money_amount"))]
    pub payment_amount: Decimal,

    /// Gateway payment identifier, used to deduplicate retries.
    #[validate(length(min = 1, max = 255, message = "external_payment_ref must be 1-255 characters"))]
    pub external_payment_ref: Option<String>,
}

/// Webhook response after recording a commission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PaymentEventResponse {
    pub commission_id: Uuid,
    pub commission_amount: Decimal,
    pub release_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commission_status_display() {
        assert_eq!(CommissionStatus::Pending.to_string(), "pending");
        assert_eq!(
            CommissionStatus::AwaitingVerification.to_string(),
            "awaiting_verification"
        );
        assert_eq!(CommissionStatus::Available.to_string(), "available");
        assert_eq!(CommissionStatus::Withdrawn.to_string(), "withdrawn");
        assert_eq!(CommissionStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_pending_statuses() {
        assert!(CommissionStatus::Pending.is_pending());
        assert!(CommissionStatus::AwaitingVerification.is_pending());
        assert!(!CommissionStatus::Available.is_pending());
        assert!(!CommissionStatus::Withdrawn.is_pending());
    }

    #[test]
    fn test_withdrawn_and_cancelled_not_cancellable() {
        assert!(CommissionStatus::Available.is_cancellable());
        assert!(!CommissionStatus::Withdrawn.is_cancellable());
        assert!(!CommissionStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn test_payment_event_deserialize() {
        let json = r#"{
            "referred_user_id": "550e8400-e29b-41d4-a716-446655440000",
            "payment_amount": "1000.00",
            "external_payment_ref": "pi_123"
        }"#;
        let req: PaymentEventRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.payment_amount, Decimal::new(100000, 2));
        assert_eq!(req.external_payment_ref.as_deref(), Some("pi_123"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_payment_event_rejects_non_positive_amount() {
        let req = PaymentEventRequest {
            referred_user_id: Uuid::new_v4(),
            payment_amount: Decimal::ZERO,
            external_payment_ref: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_payment_event_rejects_sub_cent_amount() {
        let req = PaymentEventRequest {
            referred_user_id: Uuid::new_v4(),
            payment_amount: Decimal::new(10001, 3),
            external_payment_ref: None,
        };
        assert!(req.validate().is_err());
    }
}
