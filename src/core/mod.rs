//! Core business logic: recognition, rates and conversion

pub mod cache;
pub mod config;
pub mod convert;
pub mod currency;
pub mod log;
pub mod rates;
pub mod recognizer;
pub mod settings;

// Re-export main types for cleaner imports
pub use currency::CurrencyMention;
pub use rates::{RateProvider, RateSource, RateTable};
pub use settings::{Settings, SettingsChange};
