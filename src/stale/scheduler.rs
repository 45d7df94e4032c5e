//! Render-pass scheduling.
//!
//! Resolution runs on every mutation batch in a cooperative,
//! single-threaded context. Passes for the same comment supersede each
//! other: the registry hands out generation tokens and a finishing pass
//! applies its outcome only if no newer pass started meanwhile.
//! `annotate_all` is the batch entry point; a failure for one comment
//! classifies that comment orphaned and never blocks the rest.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;

use tracing::{debug, warn};

use crate::config::Config;
use crate::core::{Comment, CommentId, CommentStatus, SourceAnchor};
use crate::dom::Document;
use crate::resolve::{Resolution, resolve};

use super::classify::{SourceDiff, Staleness, classify};

/// Token for one in-flight resolution pass of one comment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassToken {
    id: CommentId,
    generation: u64,
}

impl PassToken {
    pub fn comment_id(&self) -> &CommentId {
        &self.id
    }
}

/// Latest-pass-wins registry. One per page; not thread-safe by design
/// (the browser context is cooperatively scheduled).
#[derive(Debug, Default)]
pub struct PassRegistry {
    generations: HashMap<CommentId, u64>,
}

impl PassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a pass for `id`, superseding any in-flight pass.
    pub fn begin(&mut self, id: &CommentId) -> PassToken {
        let generation = self.generations.entry(id.clone()).or_insert(0);
        *generation += 1;
        PassToken {
            id: id.clone(),
            generation: *generation,
        }
    }

    /// Whether `token` is still the newest pass for its comment.
    pub fn is_current(&self, token: &PassToken) -> bool {
        self.generations.get(&token.id) == Some(&token.generation)
    }

    /// Apply a finished pass: returns the outcome if the token is still
    /// current, `None` if a newer pass superseded it.
    pub fn finish<T>(&self, token: &PassToken, outcome: T) -> Option<T> {
        if self.is_current(token) {
            Some(outcome)
        } else {
            debug!(comment = %token.id, "resolution pass superseded, outcome dropped");
            None
        }
    }

    /// Stop tracking a deleted comment. Outstanding tokens for it stop
    /// being current.
    pub fn forget(&mut self, id: &CommentId) {
        self.generations.remove(id);
    }

    /// Drop tracking for every comment not in `live`. Call after a
    /// reload so the registry does not accrete entries for comments
    /// long removed from the page.
    pub fn retain_live<'a>(&mut self, live: impl IntoIterator<Item = &'a CommentId>) {
        let keep: HashSet<&CommentId> = live.into_iter().collect();
        self.generations.retain(|id, _| keep.contains(id));
    }
}

/// One comment's derived state after a pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotated {
    pub id: CommentId,
    pub resolution: Resolution,
    pub staleness: Staleness,
    /// Error recorded when the pass for this comment failed; the comment
    /// is classified orphaned in that case.
    pub error: Option<String>,
}

impl Annotated {
    /// Display cross-product for the UI: resolved comments are never
    /// shown as stale, whatever the DOM looks like now.
    pub fn display(&self, persisted: CommentStatus) -> DisplayStatus {
        match persisted {
            CommentStatus::Resolved => DisplayStatus::Resolved,
            CommentStatus::Active => match self.staleness {
                Staleness::Active => DisplayStatus::Active,
                Staleness::StaleDom => DisplayStatus::StaleDom,
                Staleness::StaleSource => DisplayStatus::StaleSource,
                Staleness::Orphaned => DisplayStatus::Orphaned,
            },
        }
    }
}

/// What the UI renders for one comment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayStatus {
    Active,
    Resolved,
    StaleDom,
    StaleSource,
    Orphaned,
}

/// Resolve and classify every comment against the current document.
///
/// `source_diff` is the external collaborator query (a git diff of the
/// anchor's file between its commit and the current ref); its errors are
/// contained per comment.
pub fn annotate_all<E: Display>(
    comments: &[Comment],
    doc: &Document,
    config: &Config,
    mut source_diff: impl FnMut(&SourceAnchor) -> Result<Option<SourceDiff>, E>,
) -> Vec<Annotated> {
    comments
        .iter()
        .map(|comment| {
            let resolution = resolve(&comment.dom_anchor, doc, config);
            let diff = match &comment.source_anchor {
                Some(anchor) => match source_diff(anchor) {
                    Ok(diff) => diff,
                    Err(err) => {
                        warn!(comment = %comment.id, error = %err, "source diff failed; comment orphaned");
                        return Annotated {
                            id: comment.id.clone(),
                            resolution,
                            staleness: Staleness::Orphaned,
                            error: Some(err.to_string()),
                        };
                    }
                },
                None => None,
            };
            Annotated {
                id: comment.id.clone(),
                resolution,
                staleness: classify(comment, &resolution, diff.as_ref(), config),
                error: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::comment;
    use crate::dom::DocumentBuilder;
    use crate::resolve::{Confidence, build_anchor};

    #[test]
    fn newer_pass_supersedes_older() {
        let mut registry = PassRegistry::new();
        let id = CommentId::new_unchecked("aaaaaaaaaaaa");
        let first = registry.begin(&id);
        let second = registry.begin(&id);
        assert!(!registry.is_current(&first));
        assert!(registry.is_current(&second));
        assert_eq!(registry.finish(&first, Staleness::Active), None);
        assert_eq!(
            registry.finish(&second, Staleness::Active),
            Some(Staleness::Active)
        );
    }

    #[test]
    fn passes_for_different_comments_are_independent() {
        let mut registry = PassRegistry::new();
        let a = registry.begin(&CommentId::new_unchecked("aaaaaaaaaaaa"));
        let b = registry.begin(&CommentId::new_unchecked("bbbbbbbbbbbb"));
        assert!(registry.is_current(&a));
        assert!(registry.is_current(&b));
    }

    #[test]
    fn forgotten_comments_are_pruned_from_the_registry() {
        let mut registry = PassRegistry::new();
        let id = CommentId::new_unchecked("aaaaaaaaaaaa");
        let token = registry.begin(&id);
        registry.forget(&id);
        assert!(!registry.is_current(&token));
        assert!(registry.generations.is_empty());
    }

    #[test]
    fn retain_live_drops_removed_comments() {
        let mut registry = PassRegistry::new();
        let kept = CommentId::new_unchecked("aaaaaaaaaaaa");
        let removed = CommentId::new_unchecked("bbbbbbbbbbbb");
        let kept_token = registry.begin(&kept);
        let removed_token = registry.begin(&removed);

        registry.retain_live([&kept]);
        assert!(registry.is_current(&kept_token));
        assert!(!registry.is_current(&removed_token));
        assert_eq!(registry.generations.len(), 1);
    }

    #[test]
    fn one_failing_diff_does_not_block_the_batch() {
        let mut b = DocumentBuilder::new();
        b.open("html");
        let node = b.open("button");
        b.attr("id", "save");
        b.text("Save");
        b.close();
        b.close();
        let doc = b.build();
        let config = Config::default();

        let mut plain = comment("aaaaaaaaaaaa", 1_000);
        plain.dom_anchor = build_anchor(&doc, node, &config).unwrap();
        let mut tracked = comment("bbbbbbbbbbbb", 1_000);
        tracked.dom_anchor = plain.dom_anchor.clone();
        tracked.source_anchor = Some(crate::core::SourceAnchor {
            file_path: "src/App.tsx".into(),
            component_name: None,
            line_number: Some(3),
            commit_sha: crate::core::CommitSha::parse("abc123def456").unwrap(),
        });

        let annotated = annotate_all(&[tracked, plain], &doc, &config, |_| {
            Err("diff collaborator unreachable")
        });
        assert_eq!(annotated.len(), 2);
        assert_eq!(annotated[0].staleness, Staleness::Orphaned);
        assert!(annotated[0].error.is_some());
        // The untracked comment never consults the collaborator.
        assert_eq!(annotated[1].staleness, Staleness::Active);
        assert_eq!(annotated[1].resolution.confidence(), Some(Confidence::Exact));
    }

    #[test]
    fn resolved_comments_are_never_shown_stale() {
        let annotated = Annotated {
            id: CommentId::new_unchecked("aaaaaaaaaaaa"),
            resolution: Resolution::NotFound,
            staleness: Staleness::Orphaned,
            error: None,
        };
        assert_eq!(annotated.display(CommentStatus::Resolved), DisplayStatus::Resolved);
        assert_eq!(annotated.display(CommentStatus::Active), DisplayStatus::Orphaned);
    }
}
