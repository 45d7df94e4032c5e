//! Anchors: how a comment remembers what it was attached to.
//!
//! DomAnchor: multi-signal fingerprint of one DOM node (always present)
//! SourceAnchor: source file + git revision (framework adapter only)
//!
//! Both are immutable once the comment exists. No single DomAnchor field
//! is assumed globally unique or permanently valid; the resolver weighs
//! them together.

use serde::{Deserialize, Serialize};

use super::identity::CommitSha;

/// Bounding rectangle at comment creation time, viewport-scroll-adjusted
/// page coordinates. Used for pin positioning and the positional
/// resolution fallback.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Whether `other` matches this rect within `tolerance`, a fraction of
    /// each dimension (0.2 = ±20%). Position shifts are measured against
    /// the rect's own size, so a small element that moved across the page
    /// does not count as overlapping.
    pub fn matches_within(&self, other: &BoundingRect, tolerance: f64) -> bool {
        let dx_budget = (self.width.abs() * tolerance).max(1.0);
        let dy_budget = (self.height.abs() * tolerance).max(1.0);
        (self.x - other.x).abs() <= dx_budget
            && (self.y - other.y).abs() <= dy_budget
            && (self.width - other.width).abs() <= self.width.abs() * tolerance + 1.0
            && (self.height - other.height).abs() <= self.height.abs() * tolerance + 1.0
    }
}

/// DOM-based anchor for locating an element at runtime.
///
/// Captured once by the fingerprint builder, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomAnchor {
    /// CSS selector, unique within the document at capture time.
    pub selector: String,
    /// Text content at capture time (staleness comparison).
    pub text_content: String,
    /// Lowercase tag name ("button", "div").
    pub tag_name: String,
    /// Bounding rectangle at capture time (positional fallback).
    pub bounding_rect: BoundingRect,
    /// Truncated outer HTML (staleness comparison, never split mid-tag).
    pub html_snapshot: String,
}

/// Source-code anchor tying a DOM node to the file and git revision that
/// rendered it. Present only when a framework adapter was active.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAnchor {
    /// Source file relative to the project root.
    pub file_path: String,
    /// Component name ("LoginButton"), when the adapter knew it.
    pub component_name: Option<String>,
    /// Line number in the source file, when known.
    pub line_number: Option<u32>,
    /// Commit the page was rendered from at comment creation time.
    pub commit_sha: CommitSha,
}
