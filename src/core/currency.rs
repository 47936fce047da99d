//! Canonical currency table and mention type

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Symbols recognised in free text and the code each one stands for.
pub const SYMBOLS: [(char, &str); 7] = [
    ('$', "USD"),
    ('€', "EUR"),
    ('₺', "TRY"),
    ('£', "GBP"),
    ('¥', "JPY"),
    ('₽', "RUB"),
    ('₹', "INR"),
];

/// Three-letter codes recognised in free text.
pub const CODES: [&str; 15] = [
    "USD", "EUR", "TRY", "GBP", "JPY", "RUB", "INR", "AUD", "CAD", "CHF", "CNY", "NZD", "SEK",
    "NOK", "DKK",
];

/// An amount of money found in text, resolved to its canonical code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyMention {
    pub amount: Decimal,
    pub currency_code: String,
}

pub fn resolve_symbol(symbol: char) -> Option<&'static str> {
    SYMBOLS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, code)| *code)
}

/// Resolves a code token regardless of case, e.g. `usd` -> `USD`.
pub fn resolve_code(token: &str) -> Option<&'static str> {
    CODES
        .iter()
        .find(|code| code.eq_ignore_ascii_case(token))
        .copied()
}

pub fn is_symbol(c: char) -> bool {
    resolve_symbol(c).is_some()
}
