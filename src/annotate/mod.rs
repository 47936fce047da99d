//! Document annotation passes.
//!
//! A conversion pass first collects every eligible text node and its
//! mentions without touching the tree, then rewrites the collected nodes one
//! by one. Each rewritten node is replaced by a marker element whose text is
//! the original text with `" (<amount> <CODE>)"` inserted after every
//! converted mention. The inserted suffixes are child elements of their own,
//! which lets a reversal pass restore the original text exactly.

pub mod document;

use crate::core::convert::{convert, format_amount};
use crate::core::rates::{RateProvider, RateTable};
use crate::core::recognizer::{Match, find_all, strip_trailing_annotations};
use anyhow::Result;
use document::{Document, NodeId, NodeKind};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

/// Marks an element produced by annotation.
pub const MARKER_ATTR: &str = "data-currency-converted";
/// Marks a converted-amount suffix inside a marker element.
pub const SUFFIX_ATTR: &str = "data-currency-suffix";
/// Marks the floating tooltip, whose text is never annotated.
pub const TOOLTIP_ATTR: &str = "data-currency-tooltip";

/// Inputs of a single pass. The rate table for the target currency is
/// fetched lazily and at most once, then shared by every node of the pass.
pub struct PassContext<'a> {
    default_currency: String,
    provider: &'a dyn RateProvider,
    rates: OnceCell<Option<Arc<RateTable>>>,
}

impl<'a> PassContext<'a> {
    /// `held` is reused when its base matches `default_currency`.
    pub fn new(
        default_currency: &str,
        provider: &'a dyn RateProvider,
        held: Option<Arc<RateTable>>,
    ) -> Self {
        let held = held.filter(|table| table.base() == default_currency);
        Self {
            default_currency: default_currency.to_string(),
            provider,
            rates: OnceCell::new_with(held.map(Some)),
        }
    }

    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }

    pub async fn rates(&self) -> Option<Arc<RateTable>> {
        self.rates
            .get_or_init(|| async {
                self.provider
                    .fetch(&self.default_currency)
                    .await
                    .map(Arc::new)
            })
            .await
            .clone()
    }

    /// The table this pass used, if any.
    pub fn into_rates(self) -> Option<Arc<RateTable>> {
        self.rates.into_inner().flatten()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Text nodes with at least one mention.
    pub candidates: usize,
    /// Nodes replaced by a marker element.
    pub annotated: usize,
    /// Mentions rewritten across all nodes.
    pub conversions: usize,
    /// Nodes whose replacement failed.
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub node: NodeId,
    pub text: String,
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Original(String),
    Suffix(String),
}

fn is_eligible(doc: &Document, node: NodeId) -> bool {
    doc.ancestors(node)
        .iter()
        .all(|a| !doc.has_attribute(*a, MARKER_ATTR) && !doc.has_attribute(*a, TOOLTIP_ATTR))
}

/// Read-only first pass: eligible text nodes and their mentions.
pub fn collect(doc: &Document) -> Vec<Candidate> {
    doc.text_nodes()
        .into_iter()
        .filter(|node| is_eligible(doc, *node))
        .filter_map(|node| {
            let NodeKind::Text(text) = doc.kind(node) else {
                return None;
            };
            let matches = find_all(strip_trailing_annotations(text));
            (!matches.is_empty()).then(|| Candidate {
                node,
                text: text.clone(),
                matches,
            })
        })
        .collect()
}

/// Splits `text` around the mentions that convert. Each converted mention
/// is located textually, searching forward from the previous one, and is
/// followed by its suffix. Returns `None` when nothing converts.
fn rewrite(text: &str, matches: &[Match], default_currency: &str, table: &RateTable) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for m in matches {
        if m.mention.currency_code == default_currency {
            continue;
        }
        let Some(value) = convert(
            m.mention.amount,
            &m.mention.currency_code,
            default_currency,
            Some(table),
        ) else {
            debug!("No rate for {} into {}", m.mention.currency_code, default_currency);
            continue;
        };
        let Some(offset) = text[cursor..].find(&m.raw) else {
            continue;
        };

        let end = cursor + offset + m.raw.len();
        segments.push(Segment::Original(text[cursor..end].to_string()));
        segments.push(Segment::Suffix(format!(
            " ({} {})",
            format_amount(value),
            default_currency
        )));
        cursor = end;
    }

    if segments.is_empty() {
        return None;
    }
    if cursor < text.len() {
        segments.push(Segment::Original(text[cursor..].to_string()));
    }
    Some(segments)
}

fn build_marker(doc: &mut Document, segments: &[Segment]) -> Result<NodeId> {
    let marker = doc.create_element("span");
    doc.set_attribute(marker, MARKER_ATTR, "true")?;
    for segment in segments {
        let child = match segment {
            Segment::Original(text) => doc.create_text(text),
            Segment::Suffix(text) => {
                let suffix = doc.create_element("span");
                doc.set_attribute(suffix, SUFFIX_ATTR, "true")?;
                doc.set_text(suffix, text);
                suffix
            }
        };
        doc.append_child(marker, child)?;
    }
    Ok(marker)
}

/// Runs a full conversion pass over `doc`.
#[instrument(skip_all, fields(currency = %ctx.default_currency()))]
pub async fn convert_all(doc: &mut Document, ctx: &PassContext<'_>) -> PassReport {
    let candidates = collect(doc);
    apply(doc, candidates, ctx).await
}

/// Mutating second pass. A candidate whose node can no longer be replaced is
/// counted as failed and left as it is; the others are still rewritten.
pub async fn apply(
    doc: &mut Document,
    candidates: Vec<Candidate>,
    ctx: &PassContext<'_>,
) -> PassReport {
    let mut report = PassReport {
        candidates: candidates.len(),
        ..Default::default()
    };

    for candidate in candidates {
        let Some(table) = ctx.rates().await else {
            debug!("No rates available for {}", ctx.default_currency());
            break;
        };
        let Some(segments) = rewrite(
            &candidate.text,
            &candidate.matches,
            ctx.default_currency(),
            &table,
        ) else {
            continue;
        };

        let result = build_marker(doc, &segments)
            .and_then(|marker| doc.replace_child(marker, candidate.node));
        match result {
            Ok(()) => {
                report.annotated += 1;
                report.conversions += segments
                    .iter()
                    .filter(|s| matches!(s, Segment::Suffix(_)))
                    .count();
            }
            Err(e) => {
                debug!("Error replacing node: {:#}", e);
                report.failed += 1;
            }
        }
    }

    debug!(?report, "Conversion pass finished");
    report
}

/// Text of a marker element as it was before annotation.
fn original_text(doc: &Document, marker: NodeId) -> String {
    let descendants = doc.descendants(marker);
    if !descendants.iter().any(|d| doc.has_attribute(*d, SUFFIX_ATTR)) {
        return strip_trailing_annotations(&doc.text_content(marker)).to_string();
    }

    descendants
        .into_iter()
        .filter(|d| {
            doc.ancestors(*d)
                .into_iter()
                .take_while(|a| *a != marker)
                .all(|a| !doc.has_attribute(a, SUFFIX_ATTR))
        })
        .filter_map(|d| match doc.kind(d) {
            NodeKind::Text(text) => Some(text.as_str()),
            NodeKind::Element { .. } => None,
        })
        .collect()
}

/// Reversal pass: unwraps every marker element back into a plain text node
/// holding the original text. Returns the number of elements restored.
pub fn remove_existing_conversions(doc: &mut Document) -> usize {
    let mut restored = 0;
    for marker in doc.elements_with_attribute(MARKER_ATTR) {
        // A marker nested in one restored earlier is already gone
        if !doc.is_attached(marker) {
            continue;
        }
        let original = original_text(doc, marker);
        let text = doc.create_text(&original);
        match doc.replace_child(text, marker) {
            Ok(()) => restored += 1,
            Err(e) => debug!("Error restoring node: {:#}", e),
        }
    }
    debug!(restored, "Reversal pass finished");
    restored
}
