use std::sync::Arc;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::core::{App, SceneCtx};
use crate::device::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
use crate::gpu::{GraphicsContext, WgpuBackend};
use crate::render::RenderConfig;
use crate::runtime::FrameLoop;
use crate::scene::VisualRoot;
use crate::time::FrameTime;

/// Everything the render thread of one window owns.
pub(crate) struct Presenter<A: App> {
    window: Arc<Window>,
    gpu: Gpu,
    gfx: GraphicsContext,
    root: Option<VisualRoot>,
    app: A,
    pending: Option<GpuFrame>,
}

impl<A: App> Presenter<A> {
    pub(crate) fn new(window: Arc<Window>, gpu_init: GpuInit, render: &RenderConfig, mut app: A) -> Result<Self> {
        let gpu = pollster::block_on(Gpu::new(Arc::clone(&window), gpu_init))
            .context("GPU initialization failed for window")?;
        let mut gfx = GraphicsContext::new(Box::new(gpu.backend()));

        let config = RenderConfig {
            frame_extent: gpu.extent(),
            ..render.clone()
        };
        let mut root = VisualRoot::new(&mut gfx, &config).context("failed to create the visual root")?;

        let extent = gpu.extent();
        app.setup(&mut SceneCtx::new(&mut gfx, &mut root, extent))
            .context("application setup failed")?;

        Ok(Self {
            window,
            gpu,
            gfx,
            root: Some(root),
            app,
            pending: None,
        })
    }

    /// Applies a new window size. Only called while the render thread is
    /// stopped.
    pub(crate) fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize(size);
        if size.width == 0 || size.height == 0 {
            return;
        }
        if let Some(root) = self.root.as_mut() {
            root.resize(&mut self.gfx, self.gpu.extent());
        }
    }

    pub(crate) fn is_visible(&self) -> bool {
        let size = self.gpu.size();
        size.width > 0 && size.height > 0
    }

    fn wgpu_backend(&mut self) -> Result<&mut WgpuBackend> {
        self.gfx
            .backend_as_mut::<WgpuBackend>()
            .context("graphics context is not backed by wgpu")
    }
}

impl<A: App> FrameLoop for Presenter<A> {
    fn frame(&mut self, time: FrameTime) -> Result<()> {
        let frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                return match self.gpu.handle_surface_error(&err) {
                    SurfaceErrorAction::Fatal => Err(err).context("surface is unusable"),
                    _ => Ok(()),
                };
            }
        };

        let extent = self.gpu.extent();
        self.wgpu_backend()?.attach_surface(frame.view.clone());
        let rendered = match self.root.as_mut() {
            Some(root) => self
                .app
                .on_frame(&mut SceneCtx::new(&mut self.gfx, root, extent), time)
                .and_then(|()| root.render(&mut self.gfx).context("scene render failed")),
            None => Ok(()),
        };
        self.wgpu_backend()?.detach_surface();
        rendered?;

        self.pending = Some(frame);
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        if let Some(frame) = self.pending.take() {
            self.window.pre_present_notify();
            frame.present();
        }
        Ok(())
    }
}

impl<A: App> Drop for Presenter<A> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            root.release(&mut self.gfx);
        }
    }
}
