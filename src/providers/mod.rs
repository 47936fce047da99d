pub mod caching;
pub mod rates_api;

pub use caching::CachingRateProvider;
pub use rates_api::RatesApiSource;
