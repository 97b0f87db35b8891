//! Strata engine crate.
//!
//! Retained-mode visual renderer: an ownership tree for GPU resources, a
//! thread-bound render context with a transform stack, a pooled offscreen
//! frame allocator for effect compositing, and the visual scene graph that
//! ties them together.

pub mod core;
pub mod device;
pub mod gpu;
pub mod resource;
pub mod runtime;
pub mod time;
pub mod window;

pub mod coords;
pub mod logging;
pub mod paint;
pub mod render;
pub mod scene;
