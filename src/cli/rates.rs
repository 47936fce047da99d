use super::ui::{StyleType, amount_cell, header_cell, new_styled_table, style_text};
use crate::core::rates::{RateProvider, RateTable};
use anyhow::{Result, bail};
use comfy_table::{Cell, Table};

pub fn rates_table(rates: &RateTable) -> Table {
    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Currency"),
        header_cell(&format!("Per 1 {}", rates.base())),
    ]);
    for (code, rate) in rates.sorted() {
        table.add_row(vec![Cell::new(code), amount_cell(&rate.normalize().to_string())]);
    }
    table
}

/// Renders the rate table for `base`; fails when no rates are available.
pub async fn rates(base: &str, provider: &dyn RateProvider) -> Result<String> {
    let Some(rates) = provider.fetch(base).await else {
        bail!("No rates available for {base}");
    };

    Ok(format!(
        "{}\n{}",
        style_text(&format!("Exchange rates for {base}"), StyleType::Title),
        rates_table(&rates)
    ))
}
