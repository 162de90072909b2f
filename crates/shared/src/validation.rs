//! Common validation utilities.

use rust_decimal::Decimal;
use validator::ValidationError;

/// Maximum length of a referral slug.
const MAX_SLUG_LENGTH: usize = 64;

/// Validates that a percentage is within 0 to 100.
pub fn validate_percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO && *value <= Decimal::ONE_HUNDRED {
        Ok(())
    } else {
        let mut err = ValidationError::new("percentage_range");
        err.message = Some("Percentage must be between 0 and 100".into());
        Err(err)
    }
}

/// Validates that a monetary amount is strictly positive.
pub fn validate_positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("amount_positive");
        err.message = Some("Amount must be greater than zero".into());
        Err(err)
    }
}

/// Validates that a monetary amount has at most two fractional digits.
pub fn validate_money_scale(value: &Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() <= crate::money::MONEY_SCALE {
        Ok(())
    } else {
        let mut err = ValidationError::new("amount_scale");
        err.message = Some("Amount must have at most two decimal places".into());
        Err(err)
    }
}

/// Validates a positive monetary amount with at most two fractional digits.
pub fn validate_money_amount(value: &Decimal) -> Result<(), ValidationError> {
    validate_positive_amount(value)?;
    validate_money_scale(value)
}

/// Validates a referral slug: lowercase ASCII letters, digits, `-` and `_`.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid = !slug.is_empty()
        && slug.len() <= MAX_SLUG_LENGTH
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("slug_format");
        err.message = Some(
            "Referral code must be 1-64 lowercase letters, digits, '-' or '_'".into(),
        );
        Err(err)
    }
}
