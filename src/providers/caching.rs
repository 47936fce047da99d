use crate::core::cache::RateCache;
use crate::core::rates::{RateProvider, RateSource, RateTable};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Rate provider that answers from the rate cache and falls back to a remote
/// source on a miss. Successful fetches are cached for the rest of the day.
pub struct CachingRateProvider<S: RateSource> {
    source: S,
    cache: RateCache,
}

impl<S: RateSource> CachingRateProvider<S> {
    pub fn new(source: S, cache: RateCache) -> Self {
        Self { source, cache }
    }
}

#[async_trait]
impl<S: RateSource> RateProvider for CachingRateProvider<S> {
    async fn fetch(&self, base: &str) -> Option<RateTable> {
        if base.is_empty() {
            warn!("No currency code provided for rates fetch");
            return None;
        }

        if let Some(cached) = self.cache.get(base).await {
            debug!("Using cached rates for {}", base);
            return Some(cached);
        }

        debug!("Cache miss, fetching rates for {}", base);
        match self.source.fetch_rates(base).await {
            Ok(rates) => {
                self.cache.put(base, &rates).await;
                Some(RateTable::from_raw(base, &rates))
            }
            Err(e) => {
                warn!("Error fetching rates for {}: {:#}", base, e);
                None
            }
        }
    }
}
