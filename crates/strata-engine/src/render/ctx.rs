use glam::Mat4;

use crate::coords::{Rect, Vec2};
use crate::gpu::{
    Backend, Buffer, GpuError, GraphicsContext, Primitive, Texture, INPUT_TEXTURE_SLOT, MATRIX_SLOT,
};

use super::context::RenderContext;
use super::effect::OutputEffect;

/// What a visual sees while rendering: the graphics context plus the
/// per-thread render state, borrowed together for one traversal.
pub struct RenderCtx<'a> {
    pub gfx: &'a mut GraphicsContext,
    pub vrc: &'a mut RenderContext,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(gfx: &'a mut GraphicsContext, vrc: &'a mut RenderContext) -> Self {
        Self { gfx, vrc }
    }

    #[inline]
    pub fn backend(&mut self) -> &mut dyn Backend {
        self.gfx.backend()
    }

    // ── transforms ────────────────────────────────────────────────────────

    #[inline]
    pub fn push_matrix(&mut self, m: Mat4) {
        self.vrc.push_matrix(m);
    }

    #[inline]
    pub fn pop_matrix(&mut self) {
        self.vrc.pop_matrix();
    }

    #[inline]
    pub fn top(&self) -> Mat4 {
        self.vrc.top_matrix()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.vrc.matrix_depth()
    }

    /// Uploads the current transform and binds it.
    pub fn flush_matrix(&mut self) -> Result<(), GpuError> {
        self.vrc.flush_matrix(self.gfx)?;
        self.vrc.bind_matrix(self.gfx);
        Ok(())
    }

    /// Points the shared vertex array at `shape` and makes it current.
    pub fn use_shape(&mut self, shape: Buffer) -> Result<(), GpuError> {
        let va = self.vrc.vertex_array.id;
        let backend = self.gfx.backend();
        backend.vertex_array_buffer(va, shape.id)?;
        backend.use_vertex_array(va);
        Ok(())
    }

    // ── frames ────────────────────────────────────────────────────────────

    #[inline]
    pub fn request_frame(&mut self) -> Result<Texture, GpuError> {
        self.vrc.frames.request(self.gfx)
    }

    #[inline]
    pub fn restore_frame(&mut self) -> Result<(), GpuError> {
        self.vrc.frames.restore_last(self.gfx)
    }

    /// Area of the current target that `bounds` (local space, under
    /// `transform` and the stack top) can touch, as an NDC rectangle snapped
    /// to whole pixels. `overhang` is extra reach in pixels, e.g. half a
    /// stroke width. `None` if nothing of it lies on the target.
    pub fn blit_region(&mut self, bounds: Rect, transform: &Mat4, overhang: f32) -> Option<Rect> {
        let full = self.top() * *transform;
        let ndc = bounds.transformed(&full);
        if !(ndc.min.is_finite() && ndc.max.is_finite()) {
            return None;
        }

        let extent = self.gfx.backend().target_extent();
        if extent.is_empty() {
            return None;
        }
        let px = Rect::from_corners(extent.ndc_to_pixel(ndc.min), extent.ndc_to_pixel(ndc.max))
            .outset(overhang.max(0.0) + 1.0);
        let snapped = Rect::new(px.min.x.floor(), px.min.y.floor(), px.max.x.ceil(), px.max.y.ceil());
        let clipped = snapped.intersect(Rect::new(0.0, 0.0, extent.width as f32, extent.height as f32))?;
        if clipped.is_empty() {
            return None;
        }

        Some(Rect::from_corners(
            extent.pixel_to_ndc(clipped.min),
            extent.pixel_to_ndc(clipped.max),
        ))
    }

    /// Composites `frame` onto the current target through `effect`, covering
    /// `region` (NDC). Afterwards the frame is unbound and the transform
    /// uniform is rebound.
    pub fn blit(&mut self, frame: &Texture, effect: &mut OutputEffect, region: Rect) -> Result<(), GpuError> {
        let quad: [Vec2; 6] = region.quad();
        let quad_buffer = self.vrc.quad;
        self.gfx
            .backend()
            .buffer_data(quad_buffer.id, bytemuck::cast_slice(&quad))?;
        self.use_shape(quad_buffer)?;

        effect.apply(self.gfx)?;
        let unit = self.vrc.unit_matrix.id;
        let backend = self.gfx.backend();
        backend.bind_uniform(MATRIX_SLOT, unit);
        backend.bind_texture(INPUT_TEXTURE_SLOT, frame.id);
        let drawn = backend.draw(Primitive::Triangles, 0, quad.len() as u32);
        // The frame goes back to the pool and may become a target next.
        backend.unbind_texture(INPUT_TEXTURE_SLOT);

        self.vrc.bind_matrix(self.gfx);
        drawn
    }
}
