//! Resource ownership tree.
//!
//! Every GPU-side object is registered as a node of a [`ResourceTree`]. A node
//! owns its children; releasing a node releases the whole subtree
//! depth-first, most recently injected child first, and then runs the node's
//! own teardown hook. Each node goes `live -> released` exactly once.
//!
//! The tree is generic over the device its teardown hooks run against, so it
//! can be exercised without a GPU.

mod tree;

pub use tree::{Hook, ResourceId, ResourceTree};
