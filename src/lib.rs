pub mod annotate;
pub mod cli;
pub mod core;
pub mod providers;
pub mod session;
pub mod store;

use crate::core::cache::RateCache;
use crate::core::config::AppConfig;
use crate::core::rates::RateProvider;
use crate::providers::caching::CachingRateProvider;
use crate::providers::rates_api::RatesApiSource;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    /// Annotate a page read from `input` (stdin when absent).
    Convert {
        input: Option<String>,
        to: Option<String>,
        markup: bool,
    },
    /// List the amounts found in `text`.
    Detect { text: String, to: Option<String> },
    /// Show the rate table for `base`.
    Rates { base: String },
}

/// Rate provider backed by the configured rates endpoint and the persistent
/// daily cache.
pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn RateProvider>> {
    let base_url = config.rates_base_url();
    debug!("Using rates endpoint {}", base_url);

    let source = RatesApiSource::new(base_url)?;
    let cache = RateCache::new(store::open_rate_collection(config));
    Ok(Arc::new(CachingRateProvider::new(source, cache)))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("pricelens starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let output = execute(command, &config).await?;
    println!("{output}");
    Ok(())
}

/// Runs `command` against `config` and returns what it would print.
pub async fn execute(command: AppCommand, config: &AppConfig) -> Result<String> {
    let provider = build_provider(config)?;
    let mut settings = config.settings.clone();

    match command {
        AppCommand::Convert { input, to, markup } => {
            if let Some(code) = to {
                settings.default_currency = code.to_uppercase();
            }
            cli::convert::convert(input.as_deref(), settings, provider, markup).await
        }
        AppCommand::Detect { text, to } => {
            let target = to.map_or(settings.default_currency, |code| code.to_uppercase());
            Ok(cli::detect::detect(&text, &target, provider.as_ref()).await)
        }
        AppCommand::Rates { base } => {
            cli::rates::rates(&base.to_uppercase(), provider.as_ref()).await
        }
    }
}
