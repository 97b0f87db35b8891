use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::App;
use crate::device::GpuInit;
use crate::render::RenderConfig;
use crate::runtime::RenderThread;

use super::presenter::Presenter;

/// How often the event loop wakes up to notice a render thread that ended
/// on its own.
const WATCH_INTERVAL: Duration = Duration::from_millis(100);

const RENDER_THREAD_NAME: &str = "strata render";

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub render: RenderConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "strata".to_string(),
            initial_size: LogicalSize::new(600.0, 600.0),
            render: RenderConfig::default(),
        }
    }
}

/// Entry point for the runtime: one window, one render thread.
pub struct Runtime;

impl Runtime {
    pub fn run<A: App>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Where the window's presenter currently lives.
enum Render<A: App> {
    /// Not created yet; holds the application until the first resume.
    Pending(A),
    Running(RenderThread<Presenter<A>>),
    /// Stopped while the window has no drawable area.
    Parked(Presenter<A>),
    Gone,
}

struct AppState<A: App> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    window: Option<Arc<Window>>,
    render: Render<A>,
    failure: Option<anyhow::Error>,
}

impl<A: App> AppState<A> {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            window: None,
            render: Render::Pending(app),
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure.get_or_insert(err);
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Render::Running(thread) = std::mem::replace(&mut self.render, Render::Gone) {
            if let Err(e) = thread.stop() {
                log::error!("{e:#}");
                self.failure.get_or_insert(e);
            }
        }
        self.window = None;
        event_loop.exit();
    }

    fn create(&mut self, event_loop: &ActiveEventLoop, app: A) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let presenter = Presenter::new(Arc::clone(&window), self.gpu_init.clone(), &self.config.render, app)?;
        self.window = Some(window);
        self.render = Render::Running(RenderThread::start(RENDER_THREAD_NAME, presenter)?);
        Ok(())
    }

    /// Stops rendering, applies `size`, and restarts unless the window has
    /// no drawable area.
    fn resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        let mut presenter = match std::mem::replace(&mut self.render, Render::Gone) {
            Render::Running(thread) => thread.stop()?,
            Render::Parked(presenter) => presenter,
            other => {
                self.render = other;
                return Ok(());
            }
        };

        presenter.resize(size);
        self.render = if presenter.is_visible() {
            Render::Running(RenderThread::start(RENDER_THREAD_NAME, presenter)?)
        } else {
            log::debug!("window minimized; rendering parked");
            Render::Parked(presenter)
        };
        Ok(())
    }
}

impl<A: App> ApplicationHandler for AppState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let app = match std::mem::replace(&mut self.render, Render::Gone) {
            Render::Pending(app) => app,
            other => {
                self.render = other;
                return;
            }
        };
        if let Err(e) = self.create(event_loop, app) {
            self.fail(event_loop, e.context("failed to create the initial window"));
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Render::Running(thread) = &self.render {
            if !thread.is_running() {
                // The loop ended on its own: a frame failed.
                let err = match std::mem::replace(&mut self.render, Render::Gone) {
                    Render::Running(thread) => thread.stop().err(),
                    _ => None,
                };
                match err {
                    Some(e) => self.fail(event_loop, e),
                    None => self.shutdown(event_loop),
                }
                return;
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + WATCH_INTERVAL));
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(size) => {
                if let Err(e) = self.resize(size) {
                    self.fail(event_loop, e.context("resize failed"));
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let size = window.inner_size();
                if let Err(e) = self.resize(size) {
                    self.fail(event_loop, e.context("resize failed"));
                }
            }

            _ => {}
        }
    }
}
