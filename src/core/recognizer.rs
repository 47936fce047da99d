//! Currency mention recognition.
//!
//! The grammar is an ordered list of notations, each a named `nom` parser.
//! At every position of the input the notations are tried in precedence
//! order and the first one that matches wins; scanning then resumes after
//! the matched span.
//!
//! An amount is one or more ASCII digits with an optional fraction of one or
//! two digits, using either `.` or `,` as the decimal separator. Whitespace is
//! allowed between an amount and its symbol or code.

use crate::core::currency::{CurrencyMention, is_symbol, resolve_code, resolve_symbol};
use nom::{
    IResult, Offset,
    branch::alt,
    bytes::complete::{take, take_while, take_while_m_n},
    character::complete::{anychar, digit1, one_of},
    combinator::{consumed, map, opt, recognize, value, verify},
    multi::many0,
    sequence::{pair, separated_pair},
};
use rust_decimal::Decimal;
use std::ops::Range;
use std::str::FromStr;
use tracing::debug;

type ParseResult<'a, T> = IResult<&'a str, T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    /// `$100`, `€ 12,50`
    SymbolPrefix,
    /// `100€`, `12.50 £`
    SymbolSuffix,
    /// `100 TRY`, `12,5chf`
    CodeSuffix,
}

/// A recognised mention together with the exact text it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub notation: Notation,
    /// Byte range of `raw` within the scanned text.
    pub range: Range<usize>,
    pub raw: String,
    pub mention: CurrencyMention,
}

#[derive(Debug, Clone)]
struct Token<'a> {
    notation: Notation,
    amount: &'a str,
    unit: &'a str,
}

impl Notation {
    fn extract(self, token: &Token<'_>) -> Option<CurrencyMention> {
        let code = match self {
            Notation::SymbolPrefix | Notation::SymbolSuffix => {
                resolve_symbol(token.unit.chars().next()?)?
            }
            Notation::CodeSuffix => resolve_code(token.unit)?,
        };
        let amount = Decimal::from_str(&token.amount.replace(',', ".")).ok()?;
        Some(CurrencyMention {
            amount,
            currency_code: code.to_string(),
        })
    }
}

fn amount(input: &str) -> ParseResult<'_, &str> {
    recognize(pair(
        digit1,
        opt(pair(
            one_of(".,"),
            take_while_m_n(1, 2, |c: char| c.is_ascii_digit()),
        )),
    ))(input)
}

fn gap(input: &str) -> ParseResult<'_, &str> {
    take_while(char::is_whitespace)(input)
}

fn symbol(input: &str) -> ParseResult<'_, &str> {
    recognize(verify(anychar, |c: &char| is_symbol(*c)))(input)
}

fn code(input: &str) -> ParseResult<'_, &str> {
    verify(take(3usize), |unit: &str| resolve_code(unit).is_some())(input)
}

fn symbol_prefix(input: &str) -> ParseResult<'_, Token<'_>> {
    map(separated_pair(symbol, gap, amount), |(unit, amount)| Token {
        notation: Notation::SymbolPrefix,
        amount,
        unit,
    })(input)
}

fn symbol_suffix(input: &str) -> ParseResult<'_, Token<'_>> {
    map(separated_pair(amount, gap, symbol), |(amount, unit)| Token {
        notation: Notation::SymbolSuffix,
        amount,
        unit,
    })(input)
}

fn code_suffix(input: &str) -> ParseResult<'_, Token<'_>> {
    map(separated_pair(amount, gap, code), |(amount, unit)| Token {
        notation: Notation::CodeSuffix,
        amount,
        unit,
    })(input)
}

/// Notations in precedence order.
fn notation(input: &str) -> ParseResult<'_, Token<'_>> {
    alt((symbol_prefix, symbol_suffix, code_suffix))(input)
}

/// Every notation in `input` with the text it spans, skipping one character
/// wherever none matches.
fn mentions(input: &str) -> ParseResult<'_, Vec<(&str, Token<'_>)>> {
    map(
        many0(alt((map(consumed(notation), Some), value(None, anychar)))),
        |found| found.into_iter().flatten().collect(),
    )(input)
}

/// Finds every mention in `text`, left to right, without overlaps.
pub fn find_all(text: &str) -> Vec<Match> {
    let Ok((_, found)) = mentions(text) else {
        return Vec::new();
    };

    found
        .into_iter()
        .filter_map(|(raw, token)| {
            let Some(mention) = token.notation.extract(&token) else {
                debug!("Dropping unresolvable match: {}", raw);
                return None;
            };
            let start = text.offset(raw);
            Some(Match {
                notation: token.notation,
                range: start..start + raw.len(),
                raw: raw.to_string(),
                mention,
            })
        })
        .collect()
}

/// Finds the first mention in `text`, used for interactive selections.
pub fn find_first(text: &str) -> Option<Match> {
    find_all(text).into_iter().next()
}

/// Returns the prefix of `text` that precedes any trailing parenthesised
/// annotations such as `" (3.33 TRY)"`. Nested parentheses are balanced; an
/// unbalanced tail is left in place.
pub fn strip_trailing_annotations(text: &str) -> &str {
    let mut clean = text;
    loop {
        let trimmed = clean.trim_end();
        if !trimmed.ends_with(')') {
            return clean;
        }

        let mut depth = 0usize;
        let mut open = None;
        for (i, c) in trimmed.char_indices().rev() {
            match c {
                ')' => depth += 1,
                '(' => {
                    depth -= 1;
                    if depth == 0 {
                        open = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        match open {
            Some(i) => clean = trimmed[..i].trim_end(),
            None => return clean,
        }
    }
}
