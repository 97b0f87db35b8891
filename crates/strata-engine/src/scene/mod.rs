//! Retained-mode scene graph.
//!
//! Responsibilities:
//! - hold the visual tree and each node's transform and output effect
//! - keep GPU ownership in step with the tree (a node owns its children)
//! - traverse once per frame, compositing effects through pooled frames
//!
//! Node kinds live one per file; [`Visual`] is the shared contract.

mod collection;
mod root;
mod triangle;
mod visual;

pub use collection::Collection;
pub use root::VisualRoot;
pub use triangle::Triangle;
pub use visual::{composite, Visual, VisualBase};
