//! Fingerprint capture and anchor resolution.

mod fingerprint;
mod matcher;
mod resolver;

pub use fingerprint::build_anchor;
pub use matcher::{normalize_ws, normalized_distance};
pub use resolver::{Confidence, Resolution, resolve};
