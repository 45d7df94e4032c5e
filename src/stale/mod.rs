//! Staleness engine: classification and render-pass scheduling.

mod classify;
mod scheduler;

pub use classify::{SourceDiff, Staleness, classify};
pub use scheduler::{Annotated, DisplayStatus, PassRegistry, PassToken, annotate_all};
