//! Fingerprint builder.
//!
//! Captures a DomAnchor for an attached element: a selector unique in the
//! document at capture time, the element's text, tag, bounding rect and a
//! truncated HTML snapshot. Deterministic for a given document state; the
//! only failure is fingerprinting a detached element.

use tracing::trace;

use crate::config::Config;
use crate::core::{CoreError, DomAnchor, InvalidTarget};
use crate::dom::{Document, NodeId, Selector};

/// Build the anchor for `node`.
pub fn build_anchor(doc: &Document, node: NodeId, config: &Config) -> Result<DomAnchor, CoreError> {
    if !doc.contains(node) {
        return Err(InvalidTarget.into());
    }
    let selector = build_selector(doc, node, config);
    trace!(selector = %selector, "captured anchor selector");
    Ok(DomAnchor {
        selector,
        text_content: doc.text_content(node),
        tag_name: doc.tag_name(node).to_string(),
        bounding_rect: doc.bounding_rect(node),
        html_snapshot: truncate_snapshot(&doc.outer_html(node), config.snapshot_budget_bytes),
    })
}

/// Selector strategy: a unique stable id, then a unique test attribute,
/// then a structural `tag:nth-of-type` path kept as short as uniqueness
/// allows (preferring at most `max_selector_depth` ancestors).
fn build_selector(doc: &Document, node: NodeId, config: &Config) -> String {
    if let Some(selector) = id_selector(doc, node) {
        return selector;
    }
    if let Some(selector) = test_attr_selector(doc, node, config) {
        return selector;
    }
    structural_selector(doc, node, config)
}

/// Usable as a selector ident: our grammar's subset of CSS identifiers.
fn usable_ident(value: &str) -> bool {
    crate::dom::is_ident(value)
}

fn unique(doc: &Document, selector: &str, node: NodeId) -> bool {
    match Selector::parse(selector) {
        Ok(sel) => {
            let hits = sel.query_all(doc);
            hits.len() == 1 && hits[0] == node
        }
        Err(_) => false,
    }
}

fn id_selector(doc: &Document, node: NodeId) -> Option<String> {
    let id = doc.attr(node, "id")?;
    if !usable_ident(id) {
        return None;
    }
    let selector = format!("#{id}");
    unique(doc, &selector, node).then_some(selector)
}

fn test_attr_selector(doc: &Document, node: NodeId, config: &Config) -> Option<String> {
    for attr in &config.test_id_attributes {
        let Some(value) = doc.attr(node, attr) else {
            continue;
        };
        if value.contains('"') || value.contains('\\') || value.contains(']') {
            continue;
        }
        let selector = format!("[{attr}=\"{value}\"]");
        if unique(doc, &selector, node) {
            return Some(selector);
        }
    }
    None
}

fn structural_selector(doc: &Document, node: NodeId, config: &Config) -> String {
    // Full path of `tag:nth-of-type(i)` segments from the node to the
    // root, re-anchored at the nearest ancestor with a usable unique id.
    let mut segments = vec![segment(doc, node)];
    let mut anchor_id = None;
    let mut cur = node;
    while let Some(parent) = doc.parent(cur) {
        if let Some(selector) = id_selector(doc, parent) {
            anchor_id = Some(selector);
            break;
        }
        segments.push(segment(doc, parent));
        cur = parent;
    }
    segments.reverse();

    // Shortest unique suffix wins; prefer staying within the configured
    // depth but never return an ambiguous selector when a longer path
    // disambiguates.
    let render = |from: usize| -> String {
        let mut parts: Vec<&str> = Vec::new();
        let anchored = from == 0 && anchor_id.is_some();
        if anchored {
            parts.push(anchor_id.as_deref().unwrap_or_default());
        }
        let mut out = String::new();
        for part in parts {
            out.push_str(part);
            out.push_str(" > ");
        }
        out.push_str(
            &segments[from..]
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" > "),
        );
        out
    };

    let max_suffix = segments.len();
    let preferred = config.max_selector_depth.min(max_suffix);
    for len in 1..=preferred {
        let candidate = render(max_suffix - len);
        if unique(doc, &candidate, node) {
            return candidate;
        }
    }
    for len in (preferred + 1)..=max_suffix {
        let candidate = render(max_suffix - len);
        if unique(doc, &candidate, node) {
            return candidate;
        }
    }
    render(0)
}

fn segment(doc: &Document, node: NodeId) -> String {
    format!("{}:nth-of-type({})", doc.tag_name(node), doc.nth_of_type(node))
}

/// Truncate rendered markup to `budget` bytes without splitting a tag:
/// the cut lands just after the last `>` inside the budget. Markup whose
/// first tag alone exceeds the budget truncates to empty.
pub(crate) fn truncate_snapshot(html: &str, budget: usize) -> String {
    if html.len() <= budget {
        return html.to_string();
    }
    match html.as_bytes()[..budget].iter().rposition(|b| *b == b'>') {
        Some(i) => html[..=i].to_string(),
        None => String::new(),
    }
}
