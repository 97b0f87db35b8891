use crate::gpu::{GpuError, GraphicsContext};
use crate::paint::Color;
use crate::resource::ResourceId;

use super::material::Material;
use super::programs;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EffectKind {
    /// Input texel times a color.
    ColorTune,
    /// Input texel unchanged.
    PassThrough,
}

/// Post-processing applied when a visual's offscreen frame is blitted back
/// onto the target below it.
#[derive(Debug)]
pub struct OutputEffect {
    kind: EffectKind,
    material: Material,
}

impl OutputEffect {
    pub fn color_tune(gfx: &mut GraphicsContext, color: Color) -> Result<Self, GpuError> {
        color.debug_assert_premul();
        let material = Material::new(gfx, "color tune effect", &programs::COLOR_TUNE, Some(color))?;
        Ok(Self {
            kind: EffectKind::ColorTune,
            material,
        })
    }

    pub fn pass_through(gfx: &mut GraphicsContext) -> Result<Self, GpuError> {
        let material = Material::new(gfx, "pass-through effect", &programs::PASS_THROUGH, None)?;
        Ok(Self {
            kind: EffectKind::PassThrough,
            material,
        })
    }

    #[inline]
    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    #[inline]
    pub fn node(&self) -> ResourceId {
        self.material.node()
    }

    /// Changes the tint of a color-tune effect. Ignored by pass-through.
    pub fn set_color(&mut self, gfx: &mut GraphicsContext, color: Color) -> Result<(), GpuError> {
        self.material.set_color(gfx, color)
    }

    pub fn apply(&mut self, gfx: &mut GraphicsContext) -> Result<(), GpuError> {
        self.material.apply(gfx)
    }
}
