//! Persistence on the git shadow branch.
//!
//! Wire format, three-way merge, and the optimistic-concurrency store.
//! Conflicts that cannot be resolved deterministically surface as
//! [`ConflictError`] and are never auto-resolved.

mod error;
mod merge;
mod sync;
mod wire;

pub use error::{ConflictError, StoreError};
pub use merge::merge;
pub use sync::{
    GitShadowBranch, LoadedFile, MemoryShadowBranch, SaveOutcome, ShadowBranch, Store, StoredFile,
};
pub use wire::{parse_comment_file, serialize_comment_file};
