//! Withdrawal request models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::validation::validate_money_amount;
use uuid::Uuid;
use validator::Validate;

use super::pagination::{default_page, default_per_page, page_bounds};

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: regex::Regex =
        regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref PHONE_REGEX: regex::Regex = regex::Regex::new(r"^\+55\d{10,11}$").unwrap();
    static ref RANDOM_KEY_REGEX: regex::Regex = regex::Regex::new(
        r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$"
    )
    .unwrap();
}

/// Lifecycle of a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Paid,
    Rejected,
}

impl WithdrawalStatus {
    /// Whether an administrator may move a request from `self` to `next`.
    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        matches!(
            (self, next),
            (WithdrawalStatus::Pending, WithdrawalStatus::Approved)
                | (WithdrawalStatus::Pending, WithdrawalStatus::Rejected)
                | (WithdrawalStatus::Approved, WithdrawalStatus::Rejected)
                | (WithdrawalStatus::Approved, WithdrawalStatus::Paid)
        )
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "pending"),
            WithdrawalStatus::Approved => write!(f, "approved"),
            WithdrawalStatus::Paid => write!(f, "paid"),
            WithdrawalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for WithdrawalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "approved" => Ok(WithdrawalStatus::Approved),
            "paid" => Ok(WithdrawalStatus::Paid),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            _ => Err(format!("Unknown withdrawal status: {}", s)),
        }
    }
}

/// Kind of PIX key the payout is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixKeyType {
    Cpf,
    Cnpj,
    Email,
    Phone,
    /// Random key (EVP) issued by the bank.
    Random,
}

impl PixKeyType {
    /// Returns the canonical form of `key`, or `None` if it is malformed.
    ///
    /// CPF/CNPJ accept punctuation and are stored as digits only; e-mails and
    /// random keys are lower-cased; phones must be `+55` followed by the area
    /// code and number.
    pub fn normalize(&self, key: &str) -> Option<String> {
        let key = key.trim();
        match self {
            PixKeyType::Cpf => digits_of_length(key, 11),
            PixKeyType::Cnpj => digits_of_length(key, 14),
            PixKeyType::Email => {
                let email = key.to_lowercase();
                (email.len() <= 77 && EMAIL_REGEX.is_match(&email)).then_some(email)
            }
            PixKeyType::Phone => {
                let phone: String = key.chars().filter(|c| !c.is_whitespace()).collect();
                PHONE_REGEX.is_match(&phone).then_some(phone)
            }
            PixKeyType::Random => {
                let random = key.to_lowercase();
                RANDOM_KEY_REGEX.is_match(&random).then_some(random)
            }
        }
    }
}

fn digits_of_length(key: &str, len: usize) -> Option<String> {
    if key
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '/')))
    {
        return None;
    }
    let digits: String = key.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() == len).then_some(digits)
}

impl std::fmt::Display for PixKeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixKeyType::Cpf => write!(f, "cpf"),
            PixKeyType::Cnpj => write!(f, "cnpj"),
            PixKeyType::Email => write!(f, "email"),
            PixKeyType::Phone => write!(f, "phone"),
            PixKeyType::Random => write!(f, "random"),
        }
    }
}

/// A payout request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub pix_key: String,
    pub pix_key_type: PixKeyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    pub status: WithdrawalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

/// Data needed to insert a withdrawal request.
#[derive(Debug, Clone)]
pub struct NewWithdrawalRequest {
    pub user_id: Uuid,
    pub amount: Decimal,
    pub pix_key: String,
    pub pix_key_type: PixKeyType,
    pub bank_name: Option<String>,
}

/// Request body for a new withdrawal.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateWithdrawalRequest {
    #[validate(custom(function = "validate_money_amount"))]
    pub amount: Decimal,

    #[validate(length(min = 1, max = 140, message = "pix_key must be 1-140 characters"))]
    pub pix_key: String,

    pub pix_key_type: PixKeyType,

    #[validate(length(max = 100, message = "bank_name must be at most 100 characters"))]
    pub bank_name: Option<String>,
}

/// Request body to reject a withdrawal.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RejectWithdrawalRequest {
    #[validate(length(min = 1, max = 500, message = "reason must be 1-500 characters"))]
    pub reason: String,
}

/// Read-only withdrawal gating for the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct WithdrawalEligibility {
    pub can_withdraw: bool,
    pub available_balance: Decimal,
    pub min_amount: Decimal,
    pub has_pending_request: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_payment_date: Option<NaiveDate>,
}

/// Query parameters for listing withdrawals.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListWithdrawalsQuery {
    #[serde(default)]
    pub status: Option<WithdrawalStatus>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

impl ListWithdrawalsQuery {
    /// Returns `(limit, offset)` with page bounds enforced.
    pub fn limit_offset(&self) -> (i64, i64) {
        page_bounds(self.page, self.per_page)
    }
}
