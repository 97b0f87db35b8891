use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};

use crate::time::{FrameClock, FrameTime};

/// State driven by a [`RenderThread`].
pub trait FrameLoop: Send + 'static {
    /// Renders one frame.
    fn frame(&mut self, time: FrameTime) -> Result<()>;

    /// Presents what [`frame`](Self::frame) rendered.
    fn present(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Handle to a thread calling `frame` then `present` in a loop.
///
/// The stop flag is checked at the top of every iteration. A failing
/// callback ends the loop; the error is returned from [`stop`](Self::stop).
/// Dropping the handle stops and joins the thread.
pub struct RenderThread<S: FrameLoop> {
    name: String,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<(S, Result<()>)>>,
}

impl<S: FrameLoop> RenderThread<S> {
    pub fn start(name: &str, state: S) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || run(state, &flag))
            .with_context(|| format!("failed to spawn render thread `{name}`"))?;

        log::debug!("render thread `{name}` started");
        Ok(Self {
            name: name.to_owned(),
            running,
            handle: Some(handle),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `false` once the loop has ended, whether stopped or failed.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stops the loop, joins the thread and hands the state back.
    ///
    /// Fails if a callback failed or the thread panicked.
    pub fn stop(mut self) -> Result<S> {
        let (state, result) = self.join()?;
        result.with_context(|| format!("render thread `{}` failed", self.name))?;
        Ok(state)
    }

    fn join(&mut self) -> Result<(S, Result<()>)> {
        self.running.store(false, Ordering::Release);
        let handle = self
            .handle
            .take()
            .ok_or_else(|| anyhow!("render thread `{}` already joined", self.name))?;
        let joined = handle
            .join()
            .map_err(|_| anyhow!("render thread `{}` panicked", self.name))?;
        log::debug!("render thread `{}` stopped", self.name);
        Ok(joined)
    }
}

impl<S: FrameLoop> Drop for RenderThread<S> {
    fn drop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        match self.join() {
            Ok((_, Err(e))) | Err(e) => log::error!("{e:#}"),
            Ok((_, Ok(()))) => {}
        }
    }
}

fn run<S: FrameLoop>(mut state: S, running: &AtomicBool) -> (S, Result<()>) {
    let mut clock = FrameClock::new();
    let result = loop {
        if !running.load(Ordering::Acquire) {
            break Ok(());
        }
        let time = clock.tick();
        if let Err(e) = state.frame(time).and_then(|()| state.present()) {
            log::error!("frame {} failed: {e:#}", time.frame_index);
            break Err(e);
        }
    };
    running.store(false, Ordering::Release);
    (state, result)
}
