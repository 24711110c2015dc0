//! Monetary amount helpers.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! All amounts are `rust_decimal::Decimal`, checked against the currency
//! minor-unit scale before they reach the ledger.

use rust_decimal::Decimal;

/// Default number of fractional digits (cents).
pub const DEFAULT_AMOUNT_SCALE: u32 = 2;

/// Returns true if `amount` carries more fractional digits than `scale`.
///
/// Trailing zeros do not count: `10.500` fits a scale of 2.
#[must_use]
pub fn exceeds_scale(amount: Decimal, scale: u32) -> bool {
    amount.normalize().scale() > scale
}

/// Normalizes an amount to exactly `scale` fractional digits.
///
/// Callers must check [`exceeds_scale`] first; this never rounds away
/// significant digits of an amount that fits.
#[must_use]
pub fn normalize(amount: Decimal, scale: u32) -> Decimal {
    let mut value = amount.normalize();
    value.rescale(scale);
    value
}

/// Adds every amount, or `None` if the running total leaves `Decimal`'s range.
#[must_use]
pub fn checked_sum<I>(amounts: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
}
