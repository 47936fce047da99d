//! Page session: owns the document, the current settings and the last rate
//! table, and turns inbound events into reversal and conversion passes.

use crate::annotate::document::{Document, NodeId};
use crate::annotate::{
    PassContext, PassReport, TOOLTIP_ATTR, convert_all, remove_existing_conversions,
};
use crate::core::convert::{convert, format_amount};
use crate::core::rates::{RateProvider, RateTable};
use crate::core::recognizer::find_first;
use crate::core::settings::{Settings, SettingsChange};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Everything that can ask the session to do work.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Some settings keys changed in the settings store.
    SettingsChanged(SettingsChange),
    /// Run conversion now, regardless of `auto_convert`.
    ConvertNow,
    /// Replace all settings and re-apply them.
    ApplySettings(Settings),
    /// Text was selected at pointer position `(x, y)`.
    Selection { text: String, x: f64, y: f64 },
    PointerDown,
}

/// What handling an event did to the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Set when a reversal pass ran, with the number of restored elements.
    pub reversed: Option<usize>,
    pub pass: Option<PassReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub text: String,
    pub left: f64,
    pub top: f64,
}

pub struct Session {
    document: Document,
    settings: Settings,
    provider: Arc<dyn RateProvider>,
    rates: Option<Arc<RateTable>>,
    tooltip_node: Option<NodeId>,
    tooltip: Option<Tooltip>,
}

impl Session {
    pub fn new(document: Document, settings: Settings, provider: Arc<dyn RateProvider>) -> Self {
        Self {
            document,
            settings,
            provider,
            rates: None,
            tooltip_node: None,
            tooltip: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The tooltip, when visible.
    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    /// Page text without the tooltip, one line per top-level element.
    pub fn render(&self, markup: bool) -> String {
        self.document
            .children(self.document.body())
            .iter()
            .filter(|child| Some(**child) != self.tooltip_node)
            .map(|child| {
                if markup {
                    self.document.markup(*child)
                } else {
                    self.document.text_content(*child)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Initial load: creates the tooltip and converts when `auto_convert` is
    /// on.
    pub async fn start(&mut self) -> Outcome {
        self.create_tooltip();
        if !self.settings.auto_convert {
            return Outcome::default();
        }
        Outcome {
            reversed: None,
            pass: Some(self.run_pass().await),
        }
    }

    #[instrument(skip(self))]
    pub async fn dispatch(&mut self, event: Event) -> Outcome {
        match event {
            Event::SettingsChanged(change) => {
                let previous = std::mem::take(&mut self.settings);
                self.settings = previous.merged(&change);
                let currency_changed = self.settings.default_currency != previous.default_currency;
                if change.auto_convert.is_none() && !currency_changed {
                    return Outcome::default();
                }
                self.refresh().await
            }
            Event::ApplySettings(settings) => {
                self.settings = Settings {
                    default_currency: settings.default_currency.to_uppercase(),
                    ..settings
                };
                self.refresh().await
            }
            Event::ConvertNow => {
                let reversed = remove_existing_conversions(&mut self.document);
                Outcome {
                    reversed: Some(reversed),
                    pass: Some(self.run_pass().await),
                }
            }
            Event::Selection { text, x, y } => {
                self.show_tooltip(&text, x, y).await;
                Outcome::default()
            }
            Event::PointerDown => {
                self.hide_tooltip();
                Outcome::default()
            }
        }
    }

    /// Reverses existing annotations, then converts again if `auto_convert`
    /// is on.
    async fn refresh(&mut self) -> Outcome {
        let reversed = remove_existing_conversions(&mut self.document);
        let pass = if self.settings.auto_convert {
            Some(self.run_pass().await)
        } else {
            None
        };
        Outcome {
            reversed: Some(reversed),
            pass,
        }
    }

    async fn run_pass(&mut self) -> PassReport {
        let ctx = PassContext::new(
            &self.settings.default_currency,
            self.provider.as_ref(),
            self.rates.clone(),
        );
        let report = convert_all(&mut self.document, &ctx).await;
        if let Some(table) = ctx.into_rates() {
            self.rates = Some(table);
        }
        info!(
            annotated = report.annotated,
            conversions = report.conversions,
            "Converted currencies into {}",
            self.settings.default_currency
        );
        report
    }

    /// The held table when it matches the default currency, otherwise a
    /// fresh one.
    async fn current_rates(&mut self) -> Option<Arc<RateTable>> {
        let currency = &self.settings.default_currency;
        if let Some(table) = self.rates.as_ref().filter(|t| t.base() == currency.as_str()) {
            return Some(Arc::clone(table));
        }
        let fetched = self.provider.fetch(currency).await.map(Arc::new);
        if fetched.is_some() {
            self.rates = fetched.clone();
        }
        fetched
    }

    fn create_tooltip(&mut self) {
        if self.tooltip_node.is_some() {
            return;
        }
        let body = self.document.body();
        let node = self.document.create_element("div");
        let created = self
            .document
            .set_attribute(node, TOOLTIP_ATTR, "true")
            .and_then(|_| self.document.set_attribute(node, "style", "display: none"))
            .and_then(|_| self.document.append_child(body, node));
        match created {
            Ok(()) => self.tooltip_node = Some(node),
            Err(e) => debug!("Error creating tooltip: {:#}", e),
        }
    }

    fn hide_tooltip(&mut self) {
        if let Some(node) = self.tooltip_node {
            if let Err(e) = self.document.set_attribute(node, "style", "display: none") {
                debug!("Error hiding tooltip: {:#}", e);
            }
        }
        self.tooltip = None;
    }

    async fn show_tooltip(&mut self, selection: &str, x: f64, y: f64) {
        let Some(node) = self.tooltip_node else {
            return;
        };
        if !self.settings.show_tooltip {
            return;
        }

        let selected = selection.trim();
        let Some(found) = find_first(selected).filter(|_| !selected.is_empty()) else {
            self.hide_tooltip();
            return;
        };
        let mention = found.mention;
        if mention.currency_code == self.settings.default_currency {
            return;
        }

        let table = self.current_rates().await;
        let Some(value) = convert(
            mention.amount,
            &mention.currency_code,
            &self.settings.default_currency,
            table.as_deref(),
        ) else {
            return;
        };

        let tooltip = Tooltip {
            text: format!(
                "{} {} = {} {}",
                mention.amount.normalize(),
                mention.currency_code,
                format_amount(value),
                self.settings.default_currency
            ),
            left: x + 10.0,
            top: y + 10.0,
        };
        self.document.set_text(node, &tooltip.text);
        let style = format!(
            "display: block; left: {}px; top: {}px",
            tooltip.left, tooltip.top
        );
        if let Err(e) = self.document.set_attribute(node, "style", &style) {
            debug!("Error showing tooltip: {:#}", e);
            return;
        }
        self.tooltip = Some(tooltip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::MARKER_ATTR;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a TRY and a EUR table and counts fetches.
    struct StubProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateProvider for StubProvider {
        async fn fetch(&self, base: &str) -> Option<RateTable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let rates = match base {
                "TRY" => HashMap::from([
                    ("USD".to_string(), Decimal::from(30)),
                    ("EUR".to_string(), Decimal::from(40)),
                ]),
                "EUR" => HashMap::from([
                    ("USD".to_string(), Decimal::new(11, 1)),
                    ("TRY".to_string(), Decimal::from(35)),
                ]),
                _ => return None,
            };
            Some(RateTable::new(base, rates))
        }
    }

    const PAGE: &str = "Laptop: $900\nShipping 20 EUR\nTotal 1000 TRY";

    fn session(settings: Settings) -> (Session, Arc<StubProvider>) {
        let provider = Arc::new(StubProvider {
            calls: AtomicUsize::new(0),
        });
        let session = Session::new(Document::from_text(PAGE), settings, provider.clone());
        (session, provider)
    }

    fn auto(on: bool) -> Settings {
        Settings {
            auto_convert: on,
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_start_without_auto_convert_leaves_page() {
        let (mut session, provider) = session(auto(false));
        let outcome = session.start().await;
        assert_eq!(outcome, Outcome::default());
        assert_eq!(session.render(false), PAGE);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_with_auto_convert() {
        let (mut session, _) = session(auto(true));
        let outcome = session.start().await;
        assert_eq!(outcome.pass.unwrap().annotated, 2);
        assert_eq!(
            session.render(false),
            "Laptop: $900 (30.00 TRY)\nShipping 20 EUR (0.50 TRY)\nTotal 1000 TRY"
        );
    }

    #[tokio::test]
    async fn test_enabling_auto_convert_runs_one_pass() {
        let (mut session, _) = session(auto(false));
        session.start().await;

        let outcome = session
            .dispatch(Event::SettingsChanged(SettingsChange {
                auto_convert: Some(true),
                ..Default::default()
            }))
            .await;
        assert_eq!(outcome.reversed, Some(0));
        assert_eq!(outcome.pass.map(|p| p.annotated), Some(2));
    }

    #[tokio::test]
    async fn test_disabling_auto_convert_reverses_without_pass() {
        let (mut session, _) = session(auto(true));
        session.start().await;

        let outcome = session
            .dispatch(Event::SettingsChanged(SettingsChange {
                auto_convert: Some(false),
                ..Default::default()
            }))
            .await;
        assert_eq!(outcome.reversed, Some(2));
        assert!(outcome.pass.is_none());
        assert_eq!(session.render(false), PAGE);
    }

    #[tokio::test]
    async fn test_tooltip_only_change_does_not_touch_page() {
        let (mut session, _) = session(auto(true));
        session.start().await;
        let before = session.render(true);

        let outcome = session
            .dispatch(Event::SettingsChanged(SettingsChange {
                show_tooltip: Some(false),
                ..Default::default()
            }))
            .await;
        assert_eq!(outcome, Outcome::default());
        assert_eq!(session.render(true), before);
        assert!(!session.settings().show_tooltip);
    }

    #[tokio::test]
    async fn test_currency_change_reconverts() {
        let (mut session, provider) = session(auto(true));
        session.start().await;

        let outcome = session
            .dispatch(Event::SettingsChanged(SettingsChange {
                default_currency: Some("EUR".to_string()),
                ..Default::default()
            }))
            .await;
        assert_eq!(outcome.reversed, Some(2));
        assert_eq!(outcome.pass.unwrap().annotated, 2);
        assert_eq!(
            session.render(false),
            "Laptop: $900 (818.18 EUR)\nShipping 20 EUR\nTotal 1000 TRY (28.57 EUR)"
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_manual_convert_is_idempotent() {
        let (mut session, provider) = session(auto(false));
        session.start().await;

        session.dispatch(Event::ConvertNow).await;
        let once = session.render(true);
        let outcome = session.dispatch(Event::ConvertNow).await;

        assert_eq!(outcome.reversed, Some(2));
        assert_eq!(session.render(true), once);
        assert_eq!(session.document().elements_with_attribute(MARKER_ATTR).len(), 2);
        // The held table is reused by the second pass
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_apply_settings() {
        let (mut session, _) = session(auto(true));
        session.start().await;

        let outcome = session
            .dispatch(Event::ApplySettings(Settings {
                default_currency: "eur".to_string(),
                auto_convert: false,
                show_tooltip: true,
            }))
            .await;
        assert_eq!(outcome.reversed, Some(2));
        assert!(outcome.pass.is_none());
        assert_eq!(session.settings().default_currency, "EUR");
        assert_eq!(session.render(false), PAGE);
    }

    #[tokio::test]
    async fn test_tooltip_on_selection() {
        let (mut session, _) = session(auto(false));
        session.start().await;

        session
            .dispatch(Event::Selection {
                text: "  1,50 € ".to_string(),
                x: 100.0,
                y: 40.0,
            })
            .await;
        let tooltip = session.tooltip().unwrap();
        assert_eq!(tooltip.text, "1.5 EUR = 0.04 TRY");
        assert_eq!((tooltip.left, tooltip.top), (110.0, 50.0));
        let node = session.tooltip_node.unwrap();
        assert_eq!(
            session.document().attribute(node, "style"),
            Some("display: block; left: 110px; top: 50px")
        );
        // The tooltip is not part of the rendered page
        assert_eq!(session.render(false), PAGE);

        session.dispatch(Event::PointerDown).await;
        assert!(session.tooltip().is_none());
        assert_eq!(
            session.document().attribute(node, "style"),
            Some("display: none")
        );
    }

    #[tokio::test]
    async fn test_tooltip_hidden_for_plain_selection_and_when_disabled() {
        let (mut session, _) = session(auto(false));
        session.start().await;

        session
            .dispatch(Event::Selection {
                text: "$10".to_string(),
                x: 0.0,
                y: 0.0,
            })
            .await;
        assert!(session.tooltip().is_some());

        session
            .dispatch(Event::Selection {
                text: "just words".to_string(),
                x: 0.0,
                y: 0.0,
            })
            .await;
        assert!(session.tooltip().is_none());

        session
            .dispatch(Event::SettingsChanged(SettingsChange {
                show_tooltip: Some(false),
                ..Default::default()
            }))
            .await;
        session
            .dispatch(Event::Selection {
                text: "$10".to_string(),
                x: 0.0,
                y: 0.0,
            })
            .await;
        assert!(session.tooltip().is_none());
    }

    #[tokio::test]
    async fn test_tooltip_text_is_never_annotated() {
        let (mut session, _) = session(auto(false));
        session.start().await;
        session
            .dispatch(Event::Selection {
                text: "$10".to_string(),
                x: 0.0,
                y: 0.0,
            })
            .await;

        session.dispatch(Event::ConvertNow).await;
        assert_eq!(session.tooltip().unwrap().text, "10 USD = 0.33 TRY");
        assert_eq!(session.document().elements_with_attribute(MARKER_ATTR).len(), 2);
    }
}
