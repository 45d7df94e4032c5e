//! The comment.
//!
//! Immutable at creation: text, branch, anchors, author, created_at.
//! Mutable afterwards: status (and updated_at, which moves with it).
//! Staleness is never stored here - it is derived at display time.

use serde::{Deserialize, Serialize};

use super::anchor::{DomAnchor, SourceAnchor};
use super::error::{CoreError, TimeInversion};
use super::identity::{BranchName, CommentId};
use super::time::Timestamp;

/// Where author info came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorSource {
    #[serde(rename = "git-config")]
    GitConfig,
    #[serde(rename = "github")]
    Github,
}

/// Comment author. Informational only; the engine never branches on it
/// beyond merge determinism.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub source: AuthorSource,
}

/// Persisted lifecycle state. Two states only; the four-state staleness
/// classification lives in [`crate::stale`] and is recomputed every pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Active,
    Resolved,
}

/// A comment attached to a UI element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub branch: BranchName,
    pub dom_anchor: DomAnchor,
    pub source_anchor: Option<SourceAnchor>,
    pub author: Author,
    pub status: CommentStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Comment {
    /// Create a new active comment; `created_at == updated_at`.
    pub fn new(
        id: CommentId,
        text: impl Into<String>,
        branch: BranchName,
        dom_anchor: DomAnchor,
        source_anchor: Option<SourceAnchor>,
        author: Author,
        at: Timestamp,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            branch,
            dom_anchor,
            source_anchor,
            author,
            status: CommentStatus::Active,
            created_at: at,
            updated_at: at,
        }
    }

    /// Change status, moving `updated_at`. Rejects a timestamp earlier
    /// than `created_at`.
    pub fn with_status(&self, status: CommentStatus, at: Timestamp) -> Result<Self, CoreError> {
        if at < self.created_at {
            return Err(TimeInversion {
                id: self.id.to_string(),
                created_at: self.created_at.to_string(),
                updated_at: at.to_string(),
            }
            .into());
        }
        let mut next = self.clone();
        next.status = status;
        next.updated_at = at;
        Ok(next)
    }

    /// Whether `updated_at >= created_at` holds.
    pub fn times_consistent(&self) -> bool {
        self.updated_at >= self.created_at
    }

    /// Equality over the fields that are immutable post-creation
    /// (everything except `status` and `updated_at`). The merge uses this
    /// to detect divergence that must never be auto-resolved.
    pub fn immutable_eq(&self, other: &Comment) -> bool {
        self.id == other.id
            && self.text == other.text
            && self.branch == other.branch
            && self.dom_anchor == other.dom_anchor
            && self.source_anchor == other.source_anchor
            && self.author == other.author
            && self.created_at == other.created_at
    }
}

#[cfg(test)]
pub mod fixtures {
    use super::*;
    use crate::core::anchor::BoundingRect;

    pub fn author() -> Author {
        Author {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            avatar_url: None,
            source: AuthorSource::GitConfig,
        }
    }

    pub fn dom_anchor() -> DomAnchor {
        DomAnchor {
            selector: "#btn".into(),
            text_content: "Click me".into(),
            tag_name: "button".into(),
            bounding_rect: BoundingRect::new(0.0, 0.0, 100.0, 32.0),
            html_snapshot: "<button id=\"btn\">Click me</button>".into(),
        }
    }

    pub fn comment(id: &str, at_ms: i64) -> Comment {
        Comment::new(
            CommentId::new_unchecked(id),
            "looks off",
            BranchName::parse("main").unwrap(),
            dom_anchor(),
            None,
            author(),
            Timestamp::from_unix_ms(at_ms),
        )
    }
}
