use crate::coords::Extent;
use crate::paint::Color;

/// Render-layer configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Size of pooled offscreen frames until the first resize.
    pub frame_extent: Extent,

    /// Clear color of the final target, applied once per frame.
    pub clear_color: Color,

    /// Clear color of each offscreen frame handed out by the pool.
    ///
    /// Transparent keeps compositing through a pass-through effect identical
    /// to drawing directly.
    pub offscreen_clear: Color,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            frame_extent: Extent::new(600, 600),
            clear_color: Color::opaque(0.2, 0.3, 0.3),
            offscreen_clear: Color::TRANSPARENT,
        }
    }
}
