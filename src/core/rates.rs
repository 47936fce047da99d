//! Exchange rate tables and the provider seams

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Raw rates as they arrive from the API and as they are cached.
pub type RawRates = BTreeMap<String, f64>;

/// Rates relative to `base`: `rates[X]` is the number of units of `X` per one
/// unit of `base`. A table is never mutated after construction; a refresh
/// replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    base: String,
    rates: HashMap<String, Decimal>,
}

impl RateTable {
    pub fn new(base: &str, rates: HashMap<String, Decimal>) -> Self {
        Self {
            base: base.to_string(),
            rates,
        }
    }

    /// Builds a table from raw rates, dropping values that are negative or
    /// not representable as a decimal.
    pub fn from_raw(base: &str, raw: &RawRates) -> Self {
        let rates = raw
            .iter()
            .filter_map(|(code, value)| {
                Decimal::try_from(*value)
                    .ok()
                    .filter(|rate| !rate.is_sign_negative())
                    .map(|rate| (code.clone(), rate))
            })
            .collect();
        Self::new(base, rates)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn rate(&self, code: &str) -> Option<Decimal> {
        self.rates.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Rates sorted by currency code.
    pub fn sorted(&self) -> Vec<(&str, Decimal)> {
        let mut rates: Vec<_> = self.rates.iter().map(|(c, r)| (c.as_str(), *r)).collect();
        rates.sort_by(|a, b| a.0.cmp(b.0));
        rates
    }
}

/// Produces a rate table for a base currency. Failures are logged by the
/// implementation and reported as `None`.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch(&self, base: &str) -> Option<RateTable>;
}

/// A remote source of raw rates, consulted on cache misses.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self, base: &str) -> anyhow::Result<RawRates>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw() {
        let raw = RawRates::from([
            ("USD".to_string(), 30.0),
            ("EUR".to_string(), 32.5),
            ("BAD".to_string(), f64::NAN),
            ("NEG".to_string(), -1.0),
        ]);
        let table = RateTable::from_raw("TRY", &raw);
        assert_eq!(table.base(), "TRY");
        assert_eq!(table.len(), 2);
        assert_eq!(table.rate("USD"), Some(Decimal::from(30)));
        assert_eq!(table.rate("EUR"), Some(Decimal::new(325, 1)));
        assert!(table.rate("BAD").is_none());
        assert!(table.rate("NEG").is_none());
    }

    #[test]
    fn test_sorted() {
        let raw = RawRates::from([("USD".to_string(), 1.0), ("AUD".to_string(), 2.0)]);
        let table = RateTable::from_raw("EUR", &raw);
        let codes: Vec<_> = table.sorted().into_iter().map(|(c, _)| c).collect();
        assert_eq!(codes, vec!["AUD", "USD"]);
    }
}
