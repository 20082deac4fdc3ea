//! Progress ratio against a period target.

use rust_decimal::Decimal;

/// `value / target`, or `None` when the target is zero.
///
/// Not clamped: a ratio above 1 means the target was exceeded. Full decimal
/// precision is kept; callers round for display. Values and targets are
/// non-negative, so a quotient too large for [`Decimal`] saturates at
/// [`Decimal::MAX`] instead of dropping the ratio.
pub fn ratio(value: Decimal, target: Decimal) -> Option<Decimal> {
    if target.is_zero() {
        return None;
    }
    Some(value.checked_div(target).unwrap_or(Decimal::MAX))
}
