//! Three-way merge of comment files.
//!
//! The merge is the sole concurrency-correctness mechanism for the
//! shadow branch: no lock exists, so it must be deterministic and
//! argument-order independent wherever both orders are legal. Rules:
//!
//! - keyed by comment id
//! - additions relative to base are kept, ordered by (createdAt, id)
//! - both sides touched the same id: later `updatedAt` wins on status;
//!   immutable fields must be identical or the merge refuses
//! - deleted on one side, mutated on the other: deletion wins
//! - duplicate ids are corruption, refused

use std::collections::HashMap;

use tracing::debug;

use crate::core::{Comment, CommentFile, CommentId, FORMAT_VERSION};

use super::error::{ConflictError, StoreError};
use super::wire::validate;

/// Merge `ours` and `theirs` against their common ancestor `base`.
///
/// Commutative in `ours`/`theirs` whenever no rule refuses; idempotent
/// (`merge(x, x, x) == x`). Never drops data to resolve a conflict.
pub fn merge(
    base: &CommentFile,
    ours: &CommentFile,
    theirs: &CommentFile,
) -> Result<CommentFile, StoreError> {
    for file in [base, ours, theirs] {
        validate(file)?;
    }
    same_key(base, ours)?;
    same_key(base, theirs)?;

    let our_index = index(ours);
    let their_index = index(theirs);
    let base_index = index(base);

    // Survivors keep base order; a comment deleted on either side is
    // gone even when the other side changed it since.
    let mut comments = Vec::with_capacity(base.comments.len());
    for existing in &base.comments {
        match (our_index.get(&existing.id), their_index.get(&existing.id)) {
            (Some(our_version), Some(their_version)) => {
                comments.push(reconcile(our_version, their_version)?);
            }
            (None, _) | (_, None) => {
                debug!(comment = %existing.id, "deletion wins over concurrent edit");
            }
        }
    }

    // Additions relative to base, from both sides, in a single
    // deterministic order.
    let mut additions: Vec<Comment> = Vec::new();
    for comment in ours.comments.iter().chain(&theirs.comments) {
        if base_index.contains_key(&comment.id) {
            continue;
        }
        if additions.iter().any(|c| c.id == comment.id) {
            continue; // already taken from the other side
        }
        match (our_index.get(&comment.id), their_index.get(&comment.id)) {
            // Same id added independently on both sides: legitimate only
            // if it is actually the same comment.
            (Some(our_version), Some(their_version)) => {
                additions.push(reconcile(our_version, their_version)?);
            }
            _ => additions.push(comment.clone()),
        }
    }
    additions.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    comments.extend(additions);

    let merged = CommentFile {
        version: FORMAT_VERSION,
        project_id: base.project_id.clone(),
        pathname: base.pathname.clone(),
        comments,
    };
    validate(&merged)?;
    Ok(merged)
}

/// Reconcile two versions of the same comment. Immutable fields must
/// agree; the later `updatedAt` wins on status, with `resolved` beating
/// `active` on an exact timestamp tie so the outcome never depends on
/// argument order.
fn reconcile(ours: &Comment, theirs: &Comment) -> Result<Comment, StoreError> {
    if !ours.immutable_eq(theirs) {
        return Err(ConflictError::ImmutableDivergence {
            id: ours.id.to_string(),
        }
        .into());
    }
    let winner = match ours.updated_at.cmp(&theirs.updated_at) {
        std::cmp::Ordering::Greater => ours,
        std::cmp::Ordering::Less => theirs,
        std::cmp::Ordering::Equal => {
            // Same instant: prefer the resolved side (cleanup wins, as
            // with deletions). Identical statuses pick either.
            if ours.status >= theirs.status {
                ours
            } else {
                theirs
            }
        }
    };
    Ok(winner.clone())
}

fn index(file: &CommentFile) -> HashMap<&CommentId, &Comment> {
    file.comments.iter().map(|c| (&c.id, c)).collect()
}

fn same_key(a: &CommentFile, b: &CommentFile) -> Result<(), StoreError> {
    if a.project_id != b.project_id || a.pathname != b.pathname {
        return Err(StoreError::KeyMismatch {
            ours: format!("{}:{}", a.project_id, a.pathname),
            theirs: format!("{}:{}", b.project_id, b.pathname),
        });
    }
    Ok(())
}

#[cfg(test)]
pub mod laws {
    use super::*;

    /// Verify merge algebra on concrete inputs: idempotence and, when no
    /// id was mutated on both sides, commutativity.
    pub fn check_merge_laws(base: &CommentFile, ours: &CommentFile, theirs: &CommentFile) {
        assert_eq!(
            merge(base, base, base).unwrap(),
            *base,
            "idempotence failed"
        );
        assert_eq!(
            merge(base, ours, theirs).unwrap(),
            merge(base, theirs, ours).unwrap(),
            "commutativity failed"
        );
    }
}
