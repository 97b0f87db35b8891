use anyhow::Result;

use crate::time::FrameTime;

use super::ctx::SceneCtx;

/// Application contract implemented by higher layers.
pub trait App: Send + 'static {
    /// Builds the scene. Called once, after the device exists.
    fn setup(&mut self, ctx: &mut SceneCtx<'_>) -> Result<()>;

    /// Called before the root is rendered, once per frame.
    fn on_frame(&mut self, ctx: &mut SceneCtx<'_>, time: FrameTime) -> Result<()> {
        let _ = (ctx, time);
        Ok(())
    }
}
