use crate::gpu::{GpuError, GraphicsContext};
use crate::paint::Color;
use crate::resource::ResourceId;

use super::material::Material;
use super::programs;

/// Fills covered pixels with one premultiplied color.
#[derive(Debug)]
pub struct SolidColorBrush {
    material: Material,
    color: Color,
}

impl SolidColorBrush {
    pub fn new(gfx: &mut GraphicsContext, color: Color) -> Result<Self, GpuError> {
        color.debug_assert_premul();
        let material = Material::new(gfx, "solid color brush", &programs::SOLID_COLOR, Some(color))?;
        Ok(Self { material, color })
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, gfx: &mut GraphicsContext, color: Color) -> Result<(), GpuError> {
        self.material.set_color(gfx, color)?;
        self.color = color;
        Ok(())
    }

    #[inline]
    pub fn node(&self) -> ResourceId {
        self.material.node()
    }

    pub fn apply(&mut self, gfx: &mut GraphicsContext) -> Result<(), GpuError> {
        self.material.apply(gfx)
    }
}
