use std::any::Any;

use crate::coords::{Rect, Vec2};
use crate::gpu::{Buffer, GpuError, GraphicsContext, Primitive};
use crate::render::{RenderCtx, SolidColorBrush};
use crate::resource::ResourceId;

use super::visual::{Visual, VisualBase};

/// A filled triangle with an optional outline.
///
/// Owns its vertex buffer and both brushes. Without a shape nothing is
/// drawn.
#[derive(Debug)]
pub struct Triangle {
    base: VisualBase,
    shape: Buffer,
    points: Option<[Vec2; 3]>,
    fill: Option<SolidColorBrush>,
    border: Option<SolidColorBrush>,
    border_width: f32,
}

impl Triangle {
    pub fn new(gfx: &mut GraphicsContext) -> Result<Self, GpuError> {
        gfx.build(None, "triangle", |gfx, node| {
            let shape = gfx.create_buffer(node, "triangle vertices")?;
            Ok(Self {
                base: VisualBase::new(node),
                shape,
                points: None,
                fill: None,
                border: None,
                border_width: 0.0,
            })
        })
    }

    #[inline]
    pub fn points(&self) -> Option<[Vec2; 3]> {
        self.points
    }

    /// Uploads new vertices (local space).
    pub fn set_shape(&mut self, gfx: &mut GraphicsContext, points: [Vec2; 3]) -> Result<(), GpuError> {
        gfx.backend().buffer_data(self.shape.id, bytemuck::cast_slice(&points))?;
        self.points = Some(points);
        Ok(())
    }

    #[inline]
    pub fn fill(&self) -> Option<&SolidColorBrush> {
        self.fill.as_ref()
    }

    #[inline]
    pub fn fill_mut(&mut self) -> Option<&mut SolidColorBrush> {
        self.fill.as_mut()
    }

    /// Attaches a fill brush; the previous one is released.
    pub fn set_fill(&mut self, gfx: &mut GraphicsContext, brush: SolidColorBrush) {
        let old = self.fill.take();
        self.fill = Some(swap_brush(gfx, self.base.node(), old, brush));
    }

    pub fn take_fill(&mut self, gfx: &mut GraphicsContext) -> Option<SolidColorBrush> {
        let brush = self.fill.take()?;
        gfx.reject(self.base.node(), brush.node(), false);
        Some(brush)
    }

    #[inline]
    pub fn border(&self) -> Option<&SolidColorBrush> {
        self.border.as_ref()
    }

    #[inline]
    pub fn border_mut(&mut self) -> Option<&mut SolidColorBrush> {
        self.border.as_mut()
    }

    /// Attaches a border brush; the previous one is released.
    pub fn set_border(&mut self, gfx: &mut GraphicsContext, brush: SolidColorBrush) {
        let old = self.border.take();
        self.border = Some(swap_brush(gfx, self.base.node(), old, brush));
    }

    pub fn take_border(&mut self, gfx: &mut GraphicsContext) -> Option<SolidColorBrush> {
        let brush = self.border.take()?;
        gfx.reject(self.base.node(), brush.node(), false);
        Some(brush)
    }

    #[inline]
    pub fn border_width(&self) -> f32 {
        self.border_width
    }

    /// Outline width in pixels. Zero disables the outline.
    pub fn set_border_width(&mut self, width: f32) {
        debug_assert!(width.is_finite() && width >= 0.0, "Triangle::set_border_width: {width}");
        self.border_width = width;
    }

    fn outlined(&self) -> bool {
        self.border.is_some() && self.border_width > 0.0
    }

    fn draw(&mut self, ctx: &mut RenderCtx<'_>) -> Result<(), GpuError> {
        if self.points.is_none() {
            return Ok(());
        }
        ctx.flush_matrix()?;
        ctx.use_shape(self.shape)?;

        if let Some(fill) = self.fill.as_mut() {
            fill.apply(ctx.gfx)?;
            ctx.backend().draw(Primitive::Triangles, 0, 3)?;
        }
        if self.border_width > 0.0 {
            if let Some(border) = self.border.as_mut() {
                border.apply(ctx.gfx)?;
                let width = self.border_width;
                ctx.backend().draw(Primitive::LineLoop { width }, 0, 3)?;
            }
        }
        Ok(())
    }
}

fn swap_brush(
    gfx: &mut GraphicsContext,
    owner: ResourceId,
    old: Option<SolidColorBrush>,
    new: SolidColorBrush,
) -> SolidColorBrush {
    if let Some(old) = old {
        gfx.reject(owner, old.node(), true);
    }
    gfx.inject(owner, new.node());
    new
}

impl Visual for Triangle {
    fn base(&self) -> &VisualBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VisualBase {
        &mut self.base
    }

    fn bounds(&mut self) -> Option<Rect> {
        Rect::from_points(self.points?)
    }

    fn overhang(&self) -> f32 {
        if self.outlined() { self.border_width * 0.5 } else { 0.0 }
    }

    fn render_content(&mut self, ctx: &mut RenderCtx<'_>) -> Result<(), GpuError> {
        ctx.push_matrix(self.base.transform());
        let drawn = self.draw(ctx);
        ctx.pop_matrix();
        drawn
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
