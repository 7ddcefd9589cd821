//! Monetary arithmetic helpers.
//!
//! Amounts are `rust_decimal::Decimal`; rounding is always half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};

/// Default number of fractional digits kept for monetary amounts.
pub const MONEY_PRECISION: u32 = 2;

/// Largest precision accepted from configuration.
pub const MAX_MONEY_PRECISION: u32 = 10;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Round an amount to `precision` fractional digits (half away from zero).
pub fn round_money(amount: Decimal, precision: u32) -> Decimal {
    amount.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount * (1 + percentage / 100)`, unrounded; `None` on overflow.
pub fn apply_markup(amount: Decimal, percentage: Decimal) -> Option<Decimal> {
    amount.checked_mul(Decimal::ONE.checked_add(percentage / HUNDRED)?)
}

/// `amount * (1 - percentage / 100)`, unrounded; `None` on overflow.
pub fn apply_discount(amount: Decimal, percentage: Decimal) -> Option<Decimal> {
    amount.checked_mul(Decimal::ONE.checked_sub(percentage / HUNDRED)?)
}

/// `amount * percentage / 100`, unrounded; `None` on overflow.
pub fn percentage_of(amount: Decimal, percentage: Decimal) -> Option<Decimal> {
    amount.checked_mul(percentage)?.checked_div(HUNDRED)
}

/// Whether `value` lies in the closed percentage range `[0, 100]`.
pub fn is_valid_percentage(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= HUNDRED
}
