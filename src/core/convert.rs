//! Conversion of amounts into a rate table's base currency.
//!
//! Results are rounded to two decimal places with midpoints rounded away from
//! zero, and are always rendered with exactly two fraction digits.

use crate::core::rates::RateTable;
use rust_decimal::{Decimal, RoundingStrategy};

/// Converts `amount` of `from` into `to`. Only defined when `to` is the base
/// of `table`; an absent table, an unknown source code or a zero rate yields
/// `None`. Callers skip mentions already in the target currency.
pub fn convert(amount: Decimal, from: &str, to: &str, table: Option<&RateTable>) -> Option<Decimal> {
    let table = table?;
    if to != table.base() {
        return None;
    }
    let rate = table.rate(from)?;
    amount
        .checked_div(rate)
        .map(|value| value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Renders an amount with two fraction digits, e.g. `3.30`.
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}
