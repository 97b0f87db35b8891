//! Coordinate and geometry types shared by the scene graph and the backends.
//!
//! Spaces in use:
//! - local: the space a visual's geometry is authored in
//! - NDC: after the accumulated transform, `[-1, 1]` on both axes, +Y up
//! - pixel: target texels, origin top-left, +Y down
//!
//! Matrices are `glam::Mat4` throughout; nothing here depends on a backend.

mod extent;
mod rect;
mod vec2;

pub use extent::Extent;
pub use rect::Rect;
pub use vec2::Vec2;
