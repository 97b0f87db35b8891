//! Strata studio: a spinning, tinted triangle.

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};

use strata_engine::coords::Vec2;
use strata_engine::core::{App, SceneCtx};
use strata_engine::device::GpuInit;
use strata_engine::logging::{init_logging, LoggingConfig};
use strata_engine::paint::Color;
use strata_engine::render::{OutputEffect, SolidColorBrush};
use strata_engine::scene::{Triangle, Visual};
use strata_engine::time::FrameTime;
use strata_engine::window::{Runtime, RuntimeConfig};

/// Rotation added every frame, in degrees about Z.
const DEGREES_PER_FRAME: f32 = 1.0;

#[derive(Default)]
struct Spinner {
    transform: Mat4,
}

impl App for Spinner {
    fn setup(&mut self, ctx: &mut SceneCtx<'_>) -> Result<()> {
        let gfx = &mut *ctx.gfx;

        let mut triangle = Triangle::new(gfx).context("triangle")?;
        triangle.set_shape(
            gfx,
            [Vec2::new(0.5, -0.5), Vec2::new(-0.5, -0.5), Vec2::new(0.0, 0.5)],
        )?;
        let fill = SolidColorBrush::new(gfx, Color::WHITE)?;
        triangle.set_fill(gfx, fill);
        let border = SolidColorBrush::new(gfx, Color::BLACK)?;
        triangle.set_border(gfx, border);
        triangle.set_border_width(4.0);

        let tint = OutputEffect::color_tune(gfx, Color::opaque(1.0, 0.85, 0.6)).context("color tune effect")?;
        triangle.base_mut().set_effect(gfx, tint);

        ctx.root.set_content(gfx, Box::new(triangle));
        self.transform = Mat4::IDENTITY;
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut SceneCtx<'_>, _time: FrameTime) -> Result<()> {
        self.transform *= Mat4::from_axis_angle(Vec3::Z, DEGREES_PER_FRAME.to_radians());
        ctx.root.base_mut().set_transform(self.transform);
        Ok(())
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "Hello World!".to_string(),
        ..RuntimeConfig::default()
    };
    Runtime::run(config, GpuInit::default(), Spinner::default())
}
