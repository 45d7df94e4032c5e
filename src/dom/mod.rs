//! Document snapshot model and the selector subset engine.

mod node;
mod selector;

pub use node::{Document, DocumentBuilder, NodeId};
pub use selector::{Selector, SelectorParseError};

pub(crate) use selector::is_ident;
