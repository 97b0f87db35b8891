//! Scenes rendered through the wgpu backend on a headless device.
//!
//! Uses the fallback (software) adapter when one is present; the tests
//! return early on machines without any adapter.

use strata_engine::coords::{Extent, Vec2};
use strata_engine::gpu::{GraphicsContext, WgpuBackend};
use strata_engine::paint::Color;
use strata_engine::render::{OutputEffect, RenderConfig, SolidColorBrush};
use strata_engine::scene::{Collection, Triangle, Visual, VisualRoot};

const EXTENT: Extent = Extent::new(16, 16);

fn device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::LowPower,
        compatible_surface: None,
        force_fallback_adapter: true,
    }))
    .ok()?;
    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()
}

/// Graphics context drawing "to the surface" through an offscreen texture.
fn setup() -> Option<(GraphicsContext, VisualRoot)> {
    let Some((device, queue)) = device() else {
        eprintln!("no wgpu adapter available; skipping");
        return None;
    };
    let format = wgpu::TextureFormat::Rgba8Unorm;
    let target = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("test surface"),
        size: wgpu::Extent3d {
            width: EXTENT.width,
            height: EXTENT.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    let mut backend = WgpuBackend::new(device, queue, format, EXTENT);
    backend.attach_surface(target.create_view(&wgpu::TextureViewDescriptor::default()));
    let mut gfx = GraphicsContext::new(Box::new(backend));
    let config = RenderConfig {
        frame_extent: EXTENT,
        ..RenderConfig::default()
    };
    let root = VisualRoot::new(&mut gfx, &config).unwrap();
    Some((gfx, root))
}

fn effected(gfx: &mut GraphicsContext) -> Box<dyn Visual> {
    let mut tri = Triangle::new(gfx).unwrap();
    tri.set_shape(gfx, [Vec2::new(-1.0, -1.0), Vec2::new(3.0, -1.0), Vec2::new(-1.0, 3.0)])
        .unwrap();
    let fill = SolidColorBrush::new(gfx, Color::WHITE).unwrap();
    tri.set_fill(gfx, fill);
    let effect = OutputEffect::pass_through(gfx).unwrap();
    tri.base_mut().set_effect(gfx, effect);
    Box::new(tri)
}

// ── frame reuse ───────────────────────────────────────────────────────────

#[test]
fn sibling_effects_share_a_frame() {
    let Some((mut gfx, mut root)) = setup() else {
        return;
    };
    let mut group = Collection::new(&mut gfx);
    for _ in 0..2 {
        let child = effected(&mut gfx);
        group.push(&mut gfx, child);
    }
    root.set_content(&mut gfx, Box::new(group));

    root.render(&mut gfx).unwrap();
    assert_eq!(root.render_context().frames().len(), 1);
}

#[test]
fn effected_visual_renders_on_consecutive_frames() {
    let Some((mut gfx, mut root)) = setup() else {
        return;
    };
    let child = effected(&mut gfx);
    root.set_content(&mut gfx, child);

    for _ in 0..3 {
        root.render(&mut gfx).unwrap();
    }
}
