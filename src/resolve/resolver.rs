//! Anchor resolver.
//!
//! Ranked multi-strategy search: selector, then content similarity, then
//! positional fallback. First success wins; ties inside a strategy break
//! by document order so resolution is reproducible.

use tracing::debug;

use crate::config::Config;
use crate::core::DomAnchor;
use crate::dom::{Document, NodeId, Selector};

use super::fingerprint::truncate_snapshot;
use super::matcher::{normalize_ws, normalized_distance};

/// How much the match can be trusted. Surfaced to the staleness engine,
/// never discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    /// Stored selector resolved to exactly one element with the stored
    /// tag.
    Exact,
    /// Content similarity cleared the threshold.
    Fuzzy,
    /// Only the stored bounding rect still agreed.
    Positional,
}

/// Outcome of resolving one anchor against a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Match { node: NodeId, confidence: Confidence },
    NotFound,
}

impl Resolution {
    pub fn confidence(&self) -> Option<Confidence> {
        match self {
            Resolution::Match { confidence, .. } => Some(*confidence),
            Resolution::NotFound => None,
        }
    }
}

/// Re-locate the element `anchor` was captured from in `doc`.
pub fn resolve(anchor: &DomAnchor, doc: &Document, config: &Config) -> Resolution {
    if let Some(node) = by_selector(anchor, doc) {
        debug!(selector = %anchor.selector, "anchor resolved by selector");
        return Resolution::Match {
            node,
            confidence: Confidence::Exact,
        };
    }
    if let Some(node) = by_content(anchor, doc, config) {
        debug!(selector = %anchor.selector, "anchor resolved by content");
        return Resolution::Match {
            node,
            confidence: Confidence::Fuzzy,
        };
    }
    if let Some(node) = by_position(anchor, doc, config) {
        debug!(selector = %anchor.selector, "anchor resolved by position");
        return Resolution::Match {
            node,
            confidence: Confidence::Positional,
        };
    }
    debug!(selector = %anchor.selector, "anchor not found");
    Resolution::NotFound
}

/// Strategy 1: the stored selector resolves to exactly one element whose
/// tag still matches. A selector that no longer parses (written by a
/// newer version) just skips to the content strategy.
fn by_selector(anchor: &DomAnchor, doc: &Document) -> Option<NodeId> {
    let selector = Selector::parse(&anchor.selector).ok()?;
    let hits = selector.query_all(doc);
    match hits.as_slice() {
        [only] if doc.tag_name(*only) == anchor.tag_name => Some(*only),
        _ => None,
    }
}

/// Strategy 2: best same-tag element whose text and snapshot are within
/// the similarity threshold. Strictly-better-to-replace keeps the first
/// element in document order on ties.
fn by_content(anchor: &DomAnchor, doc: &Document, config: &Config) -> Option<NodeId> {
    let stored_text = normalize_ws(&anchor.text_content);
    let mut best: Option<(f64, NodeId)> = None;
    for node in doc.traverse() {
        if doc.tag_name(node) != anchor.tag_name {
            continue;
        }
        let text_dist = normalized_distance(&normalize_ws(&doc.text_content(node)), &stored_text);
        let html_dist = normalized_distance(
            &truncate_snapshot(&doc.outer_html(node), config.snapshot_budget_bytes),
            &anchor.html_snapshot,
        );
        let dist = (text_dist + html_dist) / 2.0;
        if dist > config.similarity_threshold {
            continue;
        }
        if best.map_or(true, |(best_dist, _)| dist < best_dist) {
            best = Some((dist, node));
        }
    }
    best.map(|(_, node)| node)
}

/// Strategy 3: exactly one same-tag element overlaps the stored rect
/// within tolerance.
fn by_position(anchor: &DomAnchor, doc: &Document, config: &Config) -> Option<NodeId> {
    let mut hit = None;
    for node in doc.traverse() {
        if doc.tag_name(node) != anchor.tag_name {
            continue;
        }
        if !anchor
            .bounding_rect
            .matches_within(&doc.bounding_rect(node), config.rect_tolerance)
        {
            continue;
        }
        if hit.is_some() {
            // Ambiguous; positional evidence alone cannot pick one.
            return None;
        }
        hit = Some(node);
    }
    hit
}
