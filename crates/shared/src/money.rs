//! Money arithmetic helpers.
//!
//! All monetary values are exact decimals with two fractional digits.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits kept for monetary values.
pub const MONEY_SCALE: u32 = 2;

/// Rounds a monetary value to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Computes `amount * percentage / 100`, rounded to cents.
pub fn percentage_of(amount: Decimal, percentage: Decimal) -> Decimal {
    round_money(amount * percentage / Decimal::ONE_HUNDRED)
}

/// Sums an iterator of monetary values.
pub fn sum<I>(amounts: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().fold(Decimal::ZERO, |acc, a| acc + a)
}
