//! Resource lifetimes across frames, context generations and threads.

use strata_engine::coords::{Extent, Vec2};
use strata_engine::gpu::{GraphicsContext, SoftwareBackend};
use strata_engine::logging::{init_logging, LoggingConfig};
use strata_engine::paint::Color;
use strata_engine::render::{OutputEffect, RenderConfig, RenderContext, SolidColorBrush};
use strata_engine::scene::{Collection, Triangle, Visual, VisualRoot};

fn setup(extent: Extent) -> (GraphicsContext, VisualRoot) {
    init_logging(LoggingConfig::for_tests());
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

fn tinted_triangle(gfx: &mut GraphicsContext) -> Box<dyn Visual> {
    let mut tri = Triangle::new(gfx).unwrap();
    tri.set_shape(gfx, [Vec2::new(-1.0, -1.0), Vec2::new(3.0, -1.0), Vec2::new(-1.0, 3.0)])
        .unwrap();
    let fill = SolidColorBrush::new(gfx, Color::WHITE).unwrap();
    tri.set_fill(gfx, fill);
    let tint = OutputEffect::color_tune(gfx, Color::opaque(0.0, 1.0, 0.0)).unwrap();
    tri.base_mut().set_effect(gfx, tint);
    Box::new(tri)
}

// ── shared programs ───────────────────────────────────────────────────────

#[test]
fn brushes_of_one_kind_share_a_program() {
    let (mut gfx, _root) = setup(Extent::new(4, 4));
    let a = SolidColorBrush::new(&mut gfx, Color::WHITE).unwrap();
    let b = SolidColorBrush::new(&mut gfx, Color::BLACK).unwrap();
    assert_eq!(software(&gfx).live_programs(), 1);
    gfx.release(a.node());
    gfx.release(b.node());
    assert_eq!(software(&gfx).live_programs(), 1);
}

#[test]
fn scene_survives_a_new_context_generation() {
    let (mut gfx, mut root) = setup(Extent::new(8, 8));
    let content = tinted_triangle(&mut gfx);
    root.set_content(&mut gfx, content);
    root.render(&mut gfx).unwrap();
    let generation = gfx.generation();

    gfx.release_shared();
    assert_eq!(software(&gfx).live_programs(), 0);
    assert_ne!(gfx.generation(), generation);

    root.render(&mut gfx).unwrap();
    assert_eq!(software(&gfx).pixel(4, 4), Some(Color::opaque(0.0, 1.0, 0.0)));
    // Solid color and color tune, each created once more.
    assert_eq!(software(&gfx).live_programs(), 2);
}

// ── release ───────────────────────────────────────────────────────────────

#[test]
fn releasing_the_root_frees_everything_but_shared_programs() {
    let (mut gfx, mut root) = setup(Extent::new(8, 8));
    let mut group = Collection::new(&mut gfx);
    for _ in 0..2 {
        let child = tinted_triangle(&mut gfx);
        group.push(&mut gfx, child);
    }
    root.set_content(&mut gfx, Box::new(group));
    root.render(&mut gfx).unwrap();
    assert!(software(&gfx).live_objects() > software(&gfx).live_programs());

    root.release(&mut gfx);
    let sw = software(&gfx);
    assert_eq!(sw.live_objects(), sw.live_programs());
}

#[test]
fn replaced_content_is_released() {
    let (mut gfx, mut root) = setup(Extent::new(8, 8));
    let first = tinted_triangle(&mut gfx);
    let first_node = first.base().node();
    root.set_content(&mut gfx, first);

    let second = tinted_triangle(&mut gfx);
    root.set_content(&mut gfx, second);
    assert!(!gfx.is_live(first_node));
    root.render(&mut gfx).unwrap();
}

#[test]
fn failed_construction_leaks_nothing() {
    let (mut gfx, root) = setup(Extent::new(8, 8));
    root.release(&mut gfx);
    let baseline = software(&gfx).live_objects();

    for budget in 0..6 {
        gfx.backend_as_mut::<SoftwareBackend>().unwrap().fail_after(budget);
        let result = VisualRoot::new(&mut gfx, &RenderConfig::default());
        gfx.backend_as_mut::<SoftwareBackend>().unwrap().clear_failures();
        match result {
            Ok(root) => root.release(&mut gfx),
            Err(_) => {}
        }
        assert_eq!(software(&gfx).live_objects(), baseline, "budget {budget}");
    }
}

// ── threads ───────────────────────────────────────────────────────────────

#[test]
fn each_thread_renders_with_its_own_context() {
    let workers: Vec<_> = (0..2)
        .map(|_| {
            std::thread::spawn(|| {
                let (mut gfx, mut root) = setup(Extent::new(8, 8));
                let content = tinted_triangle(&mut gfx);
                root.set_content(&mut gfx, content);
                for _ in 0..3 {
                    root.render(&mut gfx).unwrap();
                    assert_eq!(RenderContext::current(), None);
                }
                software(&gfx).pixel(4, 4)
            })
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.join().unwrap(), Some(Color::opaque(0.0, 1.0, 0.0)));
    }
}

#[test]
fn scene_can_move_between_threads_between_frames() {
    let (mut gfx, mut root) = setup(Extent::new(8, 8));
    let content = tinted_triangle(&mut gfx);
    root.set_content(&mut gfx, content);
    root.render(&mut gfx).unwrap();

    let (gfx, root) = std::thread::spawn(move || {
        root.render(&mut gfx).unwrap();
        (gfx, root)
    })
    .join()
    .unwrap();
    assert_eq!(software(&gfx).pixel(4, 4), Some(Color::opaque(0.0, 1.0, 0.0)));
    assert_eq!(root.render_context().matrix_depth(), 0);
}
