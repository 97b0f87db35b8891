//! Window and event loop.
//!
//! Owns the `winit` EventLoop and the window; frames are produced on a
//! separate render thread that is started on resume, restarted around
//! resizes and stopped on close.

mod presenter;
mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
