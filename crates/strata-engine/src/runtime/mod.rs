//! Render thread.
//!
//! One thread per graphics context drives frames until told to stop. The
//! window loop owns the [`RenderThread`] handle and talks to it only through
//! start and stop.

mod render_thread;

pub use render_thread::{FrameLoop, RenderThread};
