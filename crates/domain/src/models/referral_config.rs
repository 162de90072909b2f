//! Commission policy models.
//!
//! A single row is active at any time; editing the policy creates a new
//! version and deactivates the previous one.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::money::{percentage_of, round_money};
use shared::validation::{validate_money_amount, validate_percentage};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// How commissions are computed and how often they are paid per referred user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionType {
    /// Percentage of the first qualifying payment only.
    FirstPayment,
    /// Percentage of every qualifying payment.
    Recurring,
    /// Flat amount per qualifying payment.
    Fixed,
}

impl std::fmt::Display for CommissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommissionType::FirstPayment => write!(f, "first_payment"),
            CommissionType::Recurring => write!(f, "recurring"),
            CommissionType::Fixed => write!(f, "fixed"),
        }
    }
}

impl std::str::FromStr for CommissionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_payment" => Ok(CommissionType::FirstPayment),
            "recurring" => Ok(CommissionType::Recurring),
            "fixed" => Ok(CommissionType::Fixed),
            _ => Err(format!("Unknown commission type: {}", s)),
        }
    }
}

/// The commission policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ReferralConfig {
    pub id: Uuid,
    pub commission_percentage: Decimal,
    pub commission_type: CommissionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_commission_amount: Option<Decimal>,
    pub release_days: i32,
    pub require_referred_active: bool,
    pub min_withdrawal_amount: Decimal,
    pub payment_day: i16,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReferralConfig {
    /// Commission owed for a payment under this policy.
    ///
    /// Fixed policies pay the flat amount regardless of the payment size.
    pub fn commission_for(&self, payment_amount: Decimal) -> Decimal {
        match (self.commission_type, self.fixed_commission_amount) {
            (CommissionType::Fixed, Some(fixed)) => round_money(fixed),
            _ => percentage_of(payment_amount, self.commission_percentage),
        }
    }

    /// Date at which a commission for a payment made at `paid_at` is released.
    pub fn release_date_from(&self, paid_at: DateTime<Utc>) -> DateTime<Utc> {
        paid_at + Duration::days(i64::from(self.release_days.max(0)))
    }

    /// Whether at most one commission may exist per referred user.
    pub fn is_single_commission(&self) -> bool {
        self.commission_type == CommissionType::FirstPayment
    }

    /// Next payout date on or after `today`.
    ///
    /// `payment_day` is clamped to the length of the month, so a policy paying
    /// on day 31 pays on the 30th in April and on the 28th/29th in February.
    pub fn next_payment_date(&self, today: NaiveDate) -> NaiveDate {
        let this_month = clamped_day(today.year(), today.month(), self.payment_day);
        if today <= this_month {
            return this_month;
        }

        let (year, month) = if today.month() == 12 {
            (today.year() + 1, 1)
        } else {
            (today.year(), today.month() + 1)
        };
        clamped_day(year, month, self.payment_day)
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

fn clamped_day(year: i32, month: u32, payment_day: i16) -> NaiveDate {
    let day = (payment_day.clamp(1, 31) as u32).min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Administrative input to replace the active policy.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
#[validate(schema(function = "validate_fixed_amount_presence"))]
pub struct ReferralConfigInput {
    #[validate(custom(function = "validate_percentage"))]
    pub commission_percentage: Decimal,

    pub commission_type: CommissionType,

    #[validate(custom(function = "validate_money_amount"))]
    pub fixed_commission_amount: Option<Decimal>,

    #[validate(range(min = 0, max = 3650, message = "release_days must be between 0 and 3650"))]
    pub release_days: i32,

    #[serde(default)]
    pub require_referred_active: bool,

    #[validate(custom(function = "validate_money_amount"))]
    pub min_withdrawal_amount: Decimal,

    #[validate(range(min = 1, max = 31, message = "payment_day must be between 1 and 31"))]
    pub payment_day: i16,
}

/// `fixed_commission_amount` is present iff the policy is fixed.
fn validate_fixed_amount_presence(input: &ReferralConfigInput) -> Result<(), ValidationError> {
    let is_fixed = input.commission_type == CommissionType::Fixed;
    match (is_fixed, input.fixed_commission_amount.is_some()) {
        (true, true) | (false, false) => Ok(()),
        (true, false) => {
            let mut err = ValidationError::new("fixed_amount_required");
            err.message = Some("fixed_commission_amount is required for fixed commissions".into());
            Err(err)
        }
        (false, true) => {
            let mut err = ValidationError::new("fixed_amount_not_allowed");
            err.message =
                Some("fixed_commission_amount is only allowed for fixed commissions".into());
            Err(err)
        }
    }
}
