use std::any::Any;

use glam::Mat4;

use crate::coords::Rect;
use crate::gpu::{GpuError, GraphicsContext};
use crate::render::{OutputEffect, RenderCtx};
use crate::resource::ResourceId;

/// State every visual carries: its resource node, local transform and
/// optional output effect.
#[derive(Debug)]
pub struct VisualBase {
    node: ResourceId,
    transform: Mat4,
    effect: Option<OutputEffect>,
}

impl VisualBase {
    pub fn new(node: ResourceId) -> Self {
        Self {
            node,
            transform: Mat4::IDENTITY,
            effect: None,
        }
    }

    #[inline]
    pub fn node(&self) -> ResourceId {
        self.node
    }

    #[inline]
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    #[inline]
    pub fn set_transform(&mut self, m: Mat4) {
        self.transform = m;
    }

    #[inline]
    pub fn effect(&self) -> Option<&OutputEffect> {
        self.effect.as_ref()
    }

    #[inline]
    pub fn effect_mut(&mut self) -> Option<&mut OutputEffect> {
        self.effect.as_mut()
    }

    /// Attaches `effect`, taking ownership of it. A previous effect is
    /// released.
    pub fn set_effect(&mut self, gfx: &mut GraphicsContext, effect: OutputEffect) {
        self.clear_effect(gfx);
        gfx.inject(self.node, effect.node());
        self.effect = Some(effect);
    }

    /// Detaches and releases the current effect, if any.
    pub fn clear_effect(&mut self, gfx: &mut GraphicsContext) {
        if let Some(old) = self.effect.take() {
            gfx.reject(self.node, old.node(), true);
        }
    }

    /// Detaches the current effect and hands it back unreleased.
    pub fn take_effect(&mut self, gfx: &mut GraphicsContext) -> Option<OutputEffect> {
        let effect = self.effect.take()?;
        gfx.reject(self.node, effect.node(), false);
        Some(effect)
    }
}

/// A node of the scene graph.
///
/// Mutators are called between frames; [`render_this`](Self::render_this)
/// runs once per frame from the root.
pub trait Visual: Send + Any {
    fn base(&self) -> &VisualBase;
    fn base_mut(&mut self) -> &mut VisualBase;

    /// Bounding rectangle in the visual's own space, before its transform.
    /// `None` while there is nothing to draw.
    fn bounds(&mut self) -> Option<Rect>;

    /// Pixels drawn outside [`bounds`](Self::bounds), e.g. half a stroke.
    fn overhang(&self) -> f32 {
        0.0
    }

    /// Draws the visual onto the current target: pushes the transform,
    /// draws, pops.
    fn render_content(&mut self, ctx: &mut RenderCtx<'_>) -> Result<(), GpuError>;

    /// Draws the visual, through its output effect when it has one.
    fn render_this(&mut self, ctx: &mut RenderCtx<'_>) -> Result<(), GpuError> {
        let Some(mut effect) = self.base_mut().effect.take() else {
            return self.render_content(ctx);
        };

        let transform = self.base().transform;
        let bounds = self.bounds();
        let overhang = self.overhang();
        let result = composite(ctx, &mut effect, bounds, overhang, &transform, |ctx| {
            self.render_content(ctx)
        });
        self.base_mut().effect = Some(effect);
        result
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Visual + '_ {
    pub fn downcast_ref<T: Visual>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: Visual>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

/// Renders `content` into a pooled frame, then blits that frame onto the
/// previous target through `effect`.
///
/// The frame is returned to the pool even when `content` fails. Nothing is
/// blitted when `bounds` is `None` or falls entirely off the target.
pub fn composite<F>(
    ctx: &mut RenderCtx<'_>,
    effect: &mut OutputEffect,
    bounds: Option<Rect>,
    overhang: f32,
    transform: &Mat4,
    content: F,
) -> Result<(), GpuError>
where
    F: FnOnce(&mut RenderCtx<'_>) -> Result<(), GpuError>,
{
    let frame = ctx.request_frame()?;
    let rendered = content(ctx);
    let restored = ctx.restore_frame();
    rendered?;
    restored?;

    let Some(bounds) = bounds else {
        return Ok(());
    };
    match ctx.blit_region(bounds, transform, overhang) {
        Some(region) => ctx.blit(&frame, effect, region),
        None => {
            log::trace!("effect blit skipped: bounds are off target");
            Ok(())
        }
    }
}
