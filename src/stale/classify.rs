//! Staleness classification.
//!
//! Combines the resolver's confidence with the source-diff collaborator
//! into the four-state derived status. Never persisted; recomputed on
//! every pass. The engine treats the diff as opaque input and performs
//! no git operations itself.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{Comment, SourceAnchor};
use crate::resolve::{Confidence, Resolution};

/// Derived, display-time status of a comment's anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Staleness {
    /// Anchor resolves exactly and the source (if tracked) is unchanged.
    Active,
    /// Anchor only resolved by content similarity or position.
    StaleDom,
    /// Anchor resolves exactly but the source it came from changed.
    StaleSource,
    /// Anchor no longer resolves at all.
    Orphaned,
}

/// Output of the `diff_file` collaborator for one source anchor:
/// a diff of `filePath` between `commitSha` and the current ref.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDiff {
    pub changed: bool,
    /// Inclusive (lo, hi) line ranges that changed. Empty with
    /// `changed == true` means the whole file (rewrite, rename, removed
    /// component) - treated as overlapping.
    pub changed_line_ranges: Vec<(u32, u32)>,
}

impl SourceDiff {
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// Whether the diff touches `anchor` within `context` lines of its
    /// recorded line number. A tracked anchor without a line number goes
    /// stale on any change to its file.
    pub fn overlaps(&self, anchor: &SourceAnchor, context: u32) -> bool {
        if !self.changed {
            return false;
        }
        let Some(line) = anchor.line_number else {
            return true;
        };
        if self.changed_line_ranges.is_empty() {
            return true;
        }
        let lo = line.saturating_sub(context);
        let hi = line.saturating_add(context);
        self.changed_line_ranges
            .iter()
            .any(|(range_lo, range_hi)| *range_lo <= hi && lo <= *range_hi)
    }
}

/// Decision table, evaluated top to bottom, first matching rule applies:
///
/// | resolution        | source diff                  | status       |
/// |-------------------|------------------------------|--------------|
/// | NotFound          | any                          | orphaned     |
/// | Exact             | overlapping change           | stale-source |
/// | Exact             | no change / anchor untracked | active       |
/// | Fuzzy, Positional | any                          | stale-dom    |
///
/// A source anchor with no diff supplied (collaborator unavailable)
/// classifies from DOM confidence alone.
pub fn classify(
    comment: &Comment,
    resolution: &Resolution,
    source_diff: Option<&SourceDiff>,
    config: &Config,
) -> Staleness {
    let confidence = match resolution {
        Resolution::NotFound => return Staleness::Orphaned,
        Resolution::Match { confidence, .. } => *confidence,
    };
    match confidence {
        Confidence::Exact => {
            let source_stale = match (&comment.source_anchor, source_diff) {
                (Some(anchor), Some(diff)) => diff.overlaps(anchor, config.source_context_lines),
                _ => false,
            };
            if source_stale {
                Staleness::StaleSource
            } else {
                Staleness::Active
            }
        }
        Confidence::Fuzzy | Confidence::Positional => Staleness::StaleDom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::comment;
    use crate::core::{CommitSha, SourceAnchor};
    use crate::dom::NodeId;

    fn with_source(line: Option<u32>) -> Comment {
        let mut c = comment("aaaaaaaaaaaa", 1_000);
        c.source_anchor = Some(SourceAnchor {
            file_path: "src/Header.tsx".into(),
            component_name: Some("Header".into()),
            line_number: line,
            commit_sha: CommitSha::parse("abc123def456").unwrap(),
        });
        c
    }

    fn exact() -> Resolution {
        Resolution::Match {
            node: NodeId(0),
            confidence: Confidence::Exact,
        }
    }

    #[test]
    fn not_found_is_orphaned_regardless_of_source() {
        let c = with_source(Some(10));
        let diff = SourceDiff::unchanged();
        let got = classify(&c, &Resolution::NotFound, Some(&diff), &Config::default());
        assert_eq!(got, Staleness::Orphaned);
    }

    #[test]
    fn exact_with_unchanged_source_is_active() {
        let c = with_source(Some(10));
        let got = classify(&c, &exact(), Some(&SourceDiff::unchanged()), &Config::default());
        assert_eq!(got, Staleness::Active);
    }

    #[test]
    fn source_change_beats_exact_dom_match() {
        let c = with_source(Some(42));
        let diff = SourceDiff {
            changed: true,
            changed_line_ranges: vec![(40, 44)],
        };
        let got = classify(&c, &exact(), Some(&diff), &Config::default());
        assert_eq!(got, Staleness::StaleSource);
    }

    #[test]
    fn far_away_change_does_not_go_stale() {
        let c = with_source(Some(42));
        let diff = SourceDiff {
            changed: true,
            changed_line_ranges: vec![(100, 120)],
        };
        let got = classify(&c, &exact(), Some(&diff), &Config::default());
        assert_eq!(got, Staleness::Active);
    }

    #[test]
    fn context_window_extends_overlap() {
        // Change at line 45, anchor at 42, default context 3: touching.
        let c = with_source(Some(42));
        let diff = SourceDiff {
            changed: true,
            changed_line_ranges: vec![(45, 45)],
        };
        let got = classify(&c, &exact(), Some(&diff), &Config::default());
        assert_eq!(got, Staleness::StaleSource);
    }

    #[test]
    fn changed_file_without_line_info_is_stale() {
        let c = with_source(None);
        let diff = SourceDiff {
            changed: true,
            changed_line_ranges: vec![(1, 2)],
        };
        let got = classify(&c, &exact(), Some(&diff), &Config::default());
        assert_eq!(got, Staleness::StaleSource);

        let rewrite = SourceDiff {
            changed: true,
            changed_line_ranges: Vec::new(),
        };
        let c = with_source(Some(42));
        let got = classify(&c, &exact(), Some(&rewrite), &Config::default());
        assert_eq!(got, Staleness::StaleSource);
    }

    #[test]
    fn fuzzy_match_is_stale_dom_even_with_clean_source() {
        let c = with_source(Some(42));
        let fuzzy = Resolution::Match {
            node: NodeId(0),
            confidence: Confidence::Fuzzy,
        };
        let got = classify(&c, &fuzzy, Some(&SourceDiff::unchanged()), &Config::default());
        assert_eq!(got, Staleness::StaleDom);
    }

    #[test]
    fn untracked_anchor_classifies_from_dom_alone() {
        let c = comment("aaaaaaaaaaaa", 1_000);
        assert_eq!(c.source_anchor, None);
        assert_eq!(classify(&c, &exact(), None, &Config::default()), Staleness::Active);
        let positional = Resolution::Match {
            node: NodeId(0),
            confidence: Confidence::Positional,
        };
        assert_eq!(
            classify(&c, &positional, None, &Config::default()),
            Staleness::StaleDom
        );
    }

    #[test]
    fn wire_names_are_kebab_case() {
        assert_eq!(serde_json::to_string(&Staleness::StaleDom).unwrap(), "\"stale-dom\"");
        assert_eq!(
            serde_json::to_string(&Staleness::StaleSource).unwrap(),
            "\"stale-source\""
        );
    }
}
