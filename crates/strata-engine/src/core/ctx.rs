use crate::coords::Extent;
use crate::gpu::GraphicsContext;
use crate::scene::VisualRoot;

/// What an [`App`](super::App) may touch between frames.
pub struct SceneCtx<'a> {
    pub gfx: &'a mut GraphicsContext,
    pub root: &'a mut VisualRoot,
    /// Surface size in physical pixels.
    pub extent: Extent,
}

impl<'a> SceneCtx<'a> {
    #[inline]
    pub fn new(gfx: &'a mut GraphicsContext, root: &'a mut VisualRoot, extent: Extent) -> Self {
        Self { gfx, root, extent }
    }

    /// Width over height; 1 for an empty surface.
    pub fn aspect(&self) -> f32 {
        if self.extent.is_empty() {
            1.0
        } else {
            self.extent.width as f32 / self.extent.height as f32
        }
    }
}
