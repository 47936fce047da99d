//! Rate cache with calendar-day validity.
//!
//! Entries are keyed by the base currency the rates were fetched for and stay
//! valid until the local calendar date changes. Storage failures are logged
//! and treated as misses; they never reach the caller.

use crate::core::rates::{RateTable, RawRates};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Byte-oriented key/value storage backing the cache.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Persisted form of a cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// RFC 3339 timestamp of the write.
    pub timestamp: String,
    pub rates: RawRates,
}

impl CacheEntry {
    /// An entry is fresh when it was written on the same local calendar date
    /// as `now`. Unparseable timestamps are never fresh.
    pub fn is_fresh(&self, now: DateTime<Local>) -> bool {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|written| written.with_timezone(&Local).date_naive() == now.date_naive())
            .unwrap_or(false)
    }
}

#[derive(Clone)]
pub struct RateCache {
    store: Arc<dyn KeyValueCollection>,
}

impl RateCache {
    pub fn new(store: Arc<dyn KeyValueCollection>) -> Self {
        Self { store }
    }

    pub async fn get(&self, code: &str) -> Option<RateTable> {
        self.get_at(code, Local::now()).await
    }

    /// Looks up `code` as of `now`. Stale or corrupt entries are evicted.
    pub async fn get_at(&self, code: &str, now: DateTime<Local>) -> Option<RateTable> {
        let bytes = match self.store.get(code).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("No cached rates for {}", code);
                return None;
            }
            Err(e) => {
                debug!("Error reading rates cache for {}: {:#}", code, e);
                return None;
            }
        };

        let entry = match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) if entry.is_fresh(now) => entry,
            Ok(_) => {
                debug!("Cached rates expired for {}", code);
                self.invalidate(code).await;
                return None;
            }
            Err(e) => {
                debug!("Corrupt cache entry for {}: {}", code, e);
                self.invalidate(code).await;
                return None;
            }
        };

        debug!("Valid cached rates found for {}", code);
        Some(RateTable::from_raw(code, &entry.rates))
    }

    pub async fn put(&self, code: &str, rates: &RawRates) {
        self.put_at(code, rates, Local::now()).await
    }

    /// Overwrites the entry for `code`. A failed write leaves the cache as it
    /// was.
    pub async fn put_at(&self, code: &str, rates: &RawRates, now: DateTime<Local>) {
        let res: Result<()> = async {
            let entry = CacheEntry {
                timestamp: now.to_rfc3339(),
                rates: rates.clone(),
            };
            let bytes = serde_json::to_vec(&entry).context("Failed to encode cache entry")?;
            self.store.put(code, bytes).await
        }
        .await;

        match res {
            Ok(()) => debug!("Cached rates for {}", code),
            Err(e) => debug!("Error writing rates cache for {}: {:#}", code, e),
        }
    }

    pub async fn invalidate(&self, code: &str) {
        if let Err(e) = self.store.remove(code).await {
            debug!("Error evicting cached rates for {}: {:#}", code, e);
        }
    }
}
