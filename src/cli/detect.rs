use super::ui::{StyleType, amount_cell, format_optional_cell, header_cell, new_styled_table, style_text};
use crate::core::convert::{convert, format_amount};
use crate::core::rates::{RateProvider, RateTable};
use crate::core::recognizer::find_all;
use comfy_table::Cell;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedRow {
    pub raw: String,
    pub amount: Decimal,
    pub currency: String,
    /// Amount in the target currency; same-currency mentions keep their amount.
    pub converted: Option<Decimal>,
}

pub fn detection_rows(text: &str, target: &str, rates: Option<&RateTable>) -> Vec<DetectedRow> {
    find_all(text)
        .into_iter()
        .map(|m| {
            let converted = if m.mention.currency_code == target {
                Some(m.mention.amount)
            } else {
                convert(m.mention.amount, &m.mention.currency_code, target, rates)
            };
            DetectedRow {
                raw: m.raw,
                amount: m.mention.amount,
                currency: m.mention.currency_code,
                converted,
            }
        })
        .collect()
}

/// Renders the mentions found in `text` with their value in `target`.
pub async fn detect(text: &str, target: &str, provider: &dyn RateProvider) -> String {
    if find_all(text).is_empty() {
        return style_text("No currency amounts found", StyleType::Subtle);
    }

    let mut lines = Vec::new();
    let rates = provider.fetch(target).await;
    if rates.is_none() {
        lines.push(style_text(
            &format!("No rates available for {target}"),
            StyleType::Error,
        ));
    }

    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Text"),
        header_cell("Amount"),
        header_cell("Currency"),
        header_cell(&format!("In {target}")),
    ]);
    for row in detection_rows(text, target, rates.as_ref()) {
        table.add_row(vec![
            Cell::new(&row.raw),
            amount_cell(&row.amount.normalize().to_string()),
            Cell::new(&row.currency),
            format_optional_cell(row.converted, format_amount),
        ]);
    }

    lines.push(style_text("Detected amounts", StyleType::Title));
    lines.push(table.to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::str::FromStr;

    #[test]
    fn test_detection_rows() {
        let rates = RateTable::new(
            "EUR",
            HashMap::from([("USD".to_string(), Decimal::from(2))]),
        );
        let rows = detection_rows("$3, 4 EUR and ₹10", "EUR", Some(&rates));

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].raw, "$3");
        assert_eq!(rows[0].converted, Some(Decimal::from_str("1.50").unwrap()));
        assert_eq!(rows[1].currency, "EUR");
        assert_eq!(rows[1].converted, Some(Decimal::from(4)));
        assert_eq!(rows[2].currency, "INR");
        assert!(rows[2].converted.is_none());
    }

    #[test]
    fn test_detection_without_rates() {
        let rows = detection_rows("100 CHF", "EUR", None);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].converted.is_none());
    }
}
