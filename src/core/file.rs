//! The comment file: one JSON document per (project, pathname) pair.
//!
//! `comments` is insertion-ordered and that order survives merges.
//! Created lazily on first comment, never deleted automatically.

use serde::{Deserialize, Serialize};

use super::comment::{Comment, CommentStatus};
use super::error::CoreError;
use super::identity::{CommentId, Pathname, ProjectId};
use super::time::Timestamp;

/// Schema version this crate reads and writes.
pub const FORMAT_VERSION: u32 = 1;

/// Top-level document stored on the shadow branch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentFile {
    pub version: u32,
    pub project_id: ProjectId,
    pub pathname: Pathname,
    pub comments: Vec<Comment>,
}

impl CommentFile {
    /// Empty skeleton for a (project, pathname) pair that has no file yet.
    pub fn empty(project_id: ProjectId, pathname: Pathname) -> Self {
        Self {
            version: FORMAT_VERSION,
            project_id,
            pathname,
            comments: Vec::new(),
        }
    }

    pub fn get(&self, id: &CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| &c.id == id)
    }

    /// Append a comment, rejecting duplicate ids and inverted timestamps.
    pub fn append(&self, comment: Comment) -> Result<Self, CoreError> {
        if self.get(&comment.id).is_some() {
            return Err(CoreError::DuplicateComment(comment.id.to_string()));
        }
        if !comment.times_consistent() {
            return Err(CoreError::TimeInversion(super::error::TimeInversion {
                id: comment.id.to_string(),
                created_at: comment.created_at.to_string(),
                updated_at: comment.updated_at.to_string(),
            }));
        }
        let mut next = self.clone();
        next.comments.push(comment);
        Ok(next)
    }

    /// Set the status of one comment, moving its `updated_at`.
    pub fn set_status(
        &self,
        id: &CommentId,
        status: CommentStatus,
        at: Timestamp,
    ) -> Result<Self, CoreError> {
        let mut next = self.clone();
        let slot = next
            .comments
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| CoreError::UnknownComment(id.to_string()))?;
        *slot = slot.with_status(status, at)?;
        Ok(next)
    }

    /// Remove a comment. Removal is the only deletion path; missing ids
    /// are an error so callers notice races.
    pub fn remove(&self, id: &CommentId) -> Result<Self, CoreError> {
        if self.get(id).is_none() {
            return Err(CoreError::UnknownComment(id.to_string()));
        }
        let mut next = self.clone();
        next.comments.retain(|c| &c.id != id);
        Ok(next)
    }
}
