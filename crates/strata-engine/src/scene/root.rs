use glam::Mat4;

use crate::coords::{Extent, Rect};
use crate::gpu::{GpuError, GraphicsContext, Target};
use crate::paint::Color;
use crate::render::{RenderConfig, RenderContext, RenderCtx};

use super::visual::{composite, Visual, VisualBase};

/// Entry point of one frame.
///
/// Owns the render context used for the traversal, the top-level content
/// and the top-level output effect.
pub struct VisualRoot {
    base: VisualBase,
    vrc: RenderContext,
    content: Option<Box<dyn Visual>>,
    clear_color: Color,
}

impl VisualRoot {
    pub fn new(gfx: &mut GraphicsContext, config: &RenderConfig) -> Result<Self, GpuError> {
        gfx.build(None, "visual root", |gfx, node| {
            let vrc = RenderContext::new(gfx, Some(node), config)?;
            Ok(Self {
                base: VisualBase::new(node),
                vrc,
                content: None,
                clear_color: config.clear_color,
            })
        })
    }

    #[inline]
    pub fn base(&self) -> &VisualBase {
        &self.base
    }

    #[inline]
    pub fn base_mut(&mut self) -> &mut VisualBase {
        &mut self.base
    }

    #[inline]
    pub fn render_context(&self) -> &RenderContext {
        &self.vrc
    }

    #[inline]
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Color) {
        color.debug_assert_premul();
        self.clear_color = color;
    }

    /// Replaces the content; the previous content is released.
    pub fn set_content(&mut self, gfx: &mut GraphicsContext, content: Box<dyn Visual>) {
        if let Some(old) = self.content.take() {
            gfx.reject(self.base.node(), old.base().node(), true);
        }
        gfx.inject(self.base.node(), content.base().node());
        self.content = Some(content);
    }

    pub fn content(&self) -> Option<&dyn Visual> {
        self.content.as_deref()
    }

    pub fn content_mut(&mut self) -> Option<&mut dyn Visual> {
        let content = self.content.as_mut()?;
        Some(content.as_mut())
    }

    /// Detaches the content and hands it back unreleased.
    pub fn take_content(&mut self, gfx: &mut GraphicsContext) -> Option<Box<dyn Visual>> {
        let content = self.content.take()?;
        gfx.reject(self.base.node(), content.base().node(), false);
        Some(content)
    }

    /// Renders one frame onto the surface: clear, then content through the
    /// root effect if there is one.
    ///
    /// Binds the render context to the calling thread for the duration.
    pub fn render(&mut self, gfx: &mut GraphicsContext) -> Result<(), GpuError> {
        let Self {
            base,
            vrc,
            content,
            clear_color,
        } = self;

        let _binding = vrc.bind();
        let mut ctx = RenderCtx::new(gfx, vrc);
        let backend = ctx.backend();
        backend.set_target(Target::Surface);
        backend.clear(*clear_color)?;

        let transform = base.transform();
        let result = match base.effect_mut() {
            Some(effect) => {
                let bounds = content
                    .as_mut()
                    .and_then(|c| c.bounds().map(|b| b.transformed(&c.base().transform())));
                let overhang = content.as_ref().map_or(0.0, |c| c.overhang());
                composite(&mut ctx, effect, bounds, overhang, &transform, |ctx| {
                    draw_content(ctx, &transform, content)
                })
            }
            None => draw_content(&mut ctx, &transform, content),
        };
        debug_assert_eq!(ctx.depth(), 0, "VisualRoot::render: unbalanced transform stack");
        result
    }

    /// Resizes the surface and the offscreen frames to `extent`.
    pub fn resize(&mut self, gfx: &mut GraphicsContext, extent: Extent) {
        gfx.backend().resize_surface(extent);
        self.vrc.resize(gfx, extent);
    }

    /// Releases the root and everything it owns.
    pub fn release(self, gfx: &mut GraphicsContext) {
        gfx.release(self.base.node());
    }

    /// Bounds of the content in root space, before the root transform.
    pub fn bounds(&mut self) -> Option<Rect> {
        let content = self.content.as_mut()?;
        let transform = content.base().transform();
        content.bounds().map(|b| b.transformed(&transform))
    }
}

fn draw_content(
    ctx: &mut RenderCtx<'_>,
    transform: &Mat4,
    content: &mut Option<Box<dyn Visual>>,
) -> Result<(), GpuError> {
    let Some(content) = content.as_mut() else {
        return Ok(());
    };
    ctx.push_matrix(*transform);
    let drawn = ctx.flush_matrix().and_then(|()| content.render_this(ctx));
    ctx.pop_matrix();
    drawn
}

impl std::fmt::Debug for VisualRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualRoot")
            .field("base", &self.base)
            .field("vrc", &self.vrc.id())
            .field("content", &self.content.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::gpu::SoftwareBackend;
    use crate::render::SolidColorBrush;
    use crate::scene::Triangle;

    fn setup(extent: Extent) -> (GraphicsContext, VisualRoot) {
        let mut gfx = GraphicsContext::new(Box::new(SoftwareBackend::new(extent)));
        let config = RenderConfig {
            frame_extent: extent,
            ..RenderConfig::default()
        };
        let root = VisualRoot::new(&mut gfx, &config).unwrap();
        (gfx, root)
    }

    fn software(gfx: &GraphicsContext) -> &SoftwareBackend {
        gfx.backend_as::<SoftwareBackend>().unwrap()
    }

    fn left_half(gfx: &mut GraphicsContext) -> Box<dyn Visual> {
        let mut tri = Triangle::new(gfx).unwrap();
        tri.set_shape(gfx, [Vec2::new(-1.0, -1.0), Vec2::new(0.0, -1.0), Vec2::new(0.0, 1.0)])
            .unwrap();
        let fill = SolidColorBrush::new(gfx, Color::WHITE).unwrap();
        tri.set_fill(gfx, fill);
        Box::new(tri)
    }

    // ── frames ────────────────────────────────────────────────────────────

    #[test]
    fn empty_root_clears_the_surface() {
        let (mut gfx, mut root) = setup(Extent::new(4, 4));
        root.render(&mut gfx).unwrap();
        assert_eq!(software(&gfx).pixel(2, 2), Some(root.clear_color()));
    }

    #[test]
    fn render_unbinds_the_context() {
        let (mut gfx, mut root) = setup(Extent::new(4, 4));
        let content = left_half(&mut gfx);
        root.set_content(&mut gfx, content);
        root.render(&mut gfx).unwrap();
        assert_eq!(RenderContext::current(), None);
        assert_eq!(root.render_context().matrix_depth(), 0);
    }

    #[test]
    fn root_transform_applies_to_content() {
        let (mut gfx, mut root) = setup(Extent::new(8, 8));
        let content = left_half(&mut gfx);
        root.set_content(&mut gfx, content);
        root.base_mut()
            .set_transform(Mat4::from_translation(glam::Vec3::new(1.0, 0.0, 0.0)));
        root.render(&mut gfx).unwrap();

        // The half moved right, off the left side.
        assert_eq!(software(&gfx).pixel(1, 6), Some(root.clear_color()));
        assert_eq!(software(&gfx).pixel(5, 6), Some(Color::WHITE));
    }

    #[test]
    fn root_effect_composites_through_a_frame() {
        let (mut gfx, mut root) = setup(Extent::new(8, 8));
        let content = left_half(&mut gfx);
        root.set_content(&mut gfx, content);
        let effect = crate::render::OutputEffect::color_tune(&mut gfx, Color::opaque(1.0, 0.0, 0.0)).unwrap();
        root.base_mut().set_effect(&mut gfx, effect);
        root.render(&mut gfx).unwrap();

        assert_eq!(software(&gfx).pixel(1, 6), Some(Color::opaque(1.0, 0.0, 0.0)));
        assert_eq!(software(&gfx).pixel(6, 1), Some(root.clear_color()));
        assert_eq!(root.render_context().frames().len(), 1);
    }

    // ── ownership ─────────────────────────────────────────────────────────

    #[test]
    fn take_content_keeps_it_alive() {
        let (mut gfx, mut root) = setup(Extent::new(4, 4));
        let content = left_half(&mut gfx);
        root.set_content(&mut gfx, content);

        let content = root.take_content(&mut gfx).unwrap();
        root.release(&mut gfx);
        assert!(gfx.is_live(content.base().node()));
    }

    #[test]
    fn release_frees_every_backend_object_but_shared_programs() {
        let (mut gfx, mut root) = setup(Extent::new(4, 4));
        let content = left_half(&mut gfx);
        root.set_content(&mut gfx, content);
        root.render(&mut gfx).unwrap();

        root.release(&mut gfx);
        let sw = software(&gfx);
        assert_eq!(sw.live_objects(), sw.live_programs());
    }

    #[test]
    fn resize_reaches_surface_and_frames() {
        let (mut gfx, mut root) = setup(Extent::new(4, 4));
        root.resize(&mut gfx, Extent::new(10, 6));
        assert_eq!(gfx.backend().surface_extent(), Extent::new(10, 6));
        assert_eq!(root.render_context().frames().extent(), Extent::new(10, 6));
    }
}
