use crate::annotate::document::Document;
use crate::core::rates::RateProvider;
use crate::core::settings::Settings;
use crate::session::{Event, Session};
use anyhow::{Context, Result};
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Reads the page text from `path`, or stdin when no path is given.
pub fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {path}")),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read input from stdin")?;
            Ok(input)
        }
    }
}

/// Loads `text` as a page, one paragraph per line, and returns it with every
/// convertible amount annotated. Conversion runs on load when `auto_convert`
/// is set and is triggered manually otherwise.
pub async fn convert_text(
    text: &str,
    settings: Settings,
    provider: Arc<dyn RateProvider>,
    markup: bool,
) -> String {
    let mut session = Session::new(Document::from_text(text), settings, provider);
    let outcome = session.start().await;
    if outcome.pass.is_none() {
        let outcome = session.dispatch(Event::ConvertNow).await;
        debug!(?outcome, "Manual conversion finished");
    }
    session.render(markup)
}

/// Annotates the page read from `input`, or stdin when absent.
pub async fn convert(
    input: Option<&str>,
    settings: Settings,
    provider: Arc<dyn RateProvider>,
    markup: bool,
) -> Result<String> {
    let text = read_input(input)?;
    Ok(convert_text(&text, settings, provider, markup).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::RateTable;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    struct UsdProvider;

    #[async_trait]
    impl RateProvider for UsdProvider {
        async fn fetch(&self, base: &str) -> Option<RateTable> {
            (base == "USD").then(|| {
                RateTable::new(
                    "USD",
                    HashMap::from([
                        ("EUR".to_string(), Decimal::new(9, 1)),
                        ("GBP".to_string(), Decimal::new(8, 1)),
                    ]),
                )
            })
        }
    }

    fn usd_settings(auto_convert: bool) -> Settings {
        Settings {
            default_currency: "USD".to_string(),
            auto_convert,
            show_tooltip: true,
        }
    }

    #[tokio::test]
    async fn test_convert_text_manual() {
        let output = convert_text(
            "Hotel: 90 EUR per night\nTaxi £8\nTip $5",
            usd_settings(false),
            Arc::new(UsdProvider),
            false,
        )
        .await;
        assert_eq!(
            output,
            "Hotel: 90 EUR (100.00 USD) per night\nTaxi £8 (10.00 USD)\nTip $5"
        );
    }

    #[tokio::test]
    async fn test_convert_text_markup() {
        let output = convert_text("€9", usd_settings(true), Arc::new(UsdProvider), true).await;
        assert_eq!(
            output,
            "<p><span data-currency-converted=\"true\">€9<span data-currency-suffix=\"true\"> (10.00 USD)</span></span></p>"
        );
    }

    #[test]
    fn test_read_input_missing_file() {
        let result = read_input(Some("/nonexistent/page.txt"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read input file")
        );
    }
}
