//! Render layer between the scene graph and the GPU backend.
//!
//! Conventions:
//! - geometry is authored in local space and reaches NDC through the
//!   matrix stack held by the thread's [`RenderContext`]
//! - colors are premultiplied
//! - a visual with an output effect renders into a pooled offscreen frame
//!   that is blitted back through the effect's program

mod brush;
mod config;
mod context;
mod ctx;
mod effect;
mod frames;
mod material;
mod matrix;
pub mod programs;

pub use brush::SolidColorBrush;
pub use config::RenderConfig;
pub use context::{ContextBinding, ContextId, RenderContext};
pub use ctx::RenderCtx;
pub use effect::{EffectKind, OutputEffect};
pub use frames::FramePool;
pub use material::Material;
pub use matrix::MatrixStack;
