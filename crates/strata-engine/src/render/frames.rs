use crate::coords::Extent;
use crate::gpu::{Framebuffer, GpuError, GraphicsContext, Target, Texture};
use crate::paint::Color;
use crate::resource::ResourceId;

/// Append-only frames plus the stack pointer into them.
#[derive(Debug)]
struct FrameStack {
    node: ResourceId,
    frames: Vec<Texture>,
    top: usize,
}

/// Pool of offscreen frames handed out with a stack discipline.
///
/// [`request`](Self::request) reuses the frame at `top` when there is one
/// and appends a new frame otherwise; [`restore_last`](Self::restore_last)
/// steps back without destroying anything. Frames at or above `top` are
/// free. The pool never shrinks until it is resized.
#[derive(Debug)]
pub struct FramePool {
    node: ResourceId,
    framebuffer: Framebuffer,
    stack: FrameStack,
    extent: Extent,
    clear: Color,
    /// Target that was active before the first request.
    base: Target,
}

impl FramePool {
    pub fn new(
        gfx: &mut GraphicsContext,
        owner: Option<ResourceId>,
        extent: Extent,
        clear: Color,
    ) -> Result<Self, GpuError> {
        gfx.build(owner, "frame pool", |gfx, node| {
            let framebuffer = gfx.create_framebuffer(node, "frame pool framebuffer")?;
            let stack = gfx.create_node(Some(node), "frame stack");
            Ok(Self {
                node,
                framebuffer,
                stack: FrameStack {
                    node: stack,
                    frames: Vec::new(),
                    top: 0,
                },
                extent,
                clear,
                base: Target::Surface,
            })
        })
    }

    #[inline]
    pub fn node(&self) -> ResourceId {
        self.node
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Frames allocated so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.stack.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stack.frames.is_empty()
    }

    /// Frames currently handed out.
    #[inline]
    pub fn top(&self) -> usize {
        self.stack.top
    }

    /// Hands out the next frame, makes it the render target and clears it.
    pub fn request(&mut self, gfx: &mut GraphicsContext) -> Result<Texture, GpuError> {
        let stack = &mut self.stack;
        if stack.top == stack.frames.len() {
            let frame = gfx.create_texture(stack.node, "pooled frame", self.extent)?;
            stack.frames.push(frame);
            log::debug!(
                "frame pool grew to {} frames of {}x{}",
                stack.frames.len(),
                self.extent.width,
                self.extent.height
            );
        }

        if stack.top == 0 {
            self.base = gfx.backend().target();
        }
        let frame = stack.frames[stack.top];
        stack.top += 1;

        if let Err(e) = self.bind(gfx, frame) {
            // Step back so the caller is not left holding a frame.
            let _ = self.restore_last(gfx);
            return Err(e);
        }
        Ok(frame)
    }

    fn bind(&self, gfx: &mut GraphicsContext, frame: Texture) -> Result<(), GpuError> {
        let backend = gfx.backend();
        backend.attach_color(self.framebuffer.id, Some(frame.id))?;
        backend.set_target(Target::Framebuffer(self.framebuffer.id));
        backend.clear(self.clear)
    }

    /// Returns the last requested frame to the pool and re-targets the frame
    /// now on top, or the original target once the pool is drained. The
    /// re-attached frame keeps its contents.
    pub fn restore_last(&mut self, gfx: &mut GraphicsContext) -> Result<(), GpuError> {
        let stack = &mut self.stack;
        assert!(stack.top > 0, "FramePool::restore_last: no frame is checked out");
        stack.top -= 1;

        let backend = gfx.backend();
        match stack.top.checked_sub(1).map(|i| stack.frames[i]) {
            Some(frame) => {
                backend.attach_color(self.framebuffer.id, Some(frame.id))?;
                backend.set_target(Target::Framebuffer(self.framebuffer.id));
            }
            None => {
                backend.attach_color(self.framebuffer.id, None)?;
                backend.set_target(self.base);
            }
        }
        Ok(())
    }

    /// Discards every pooled frame; new ones are created at `extent`.
    ///
    /// Panics if a frame is still checked out.
    pub fn resize(&mut self, gfx: &mut GraphicsContext, extent: Extent) {
        assert_eq!(self.stack.top, 0, "FramePool::resize: frames are still checked out");

        gfx.reject(self.node, self.stack.node, true);
        self.stack = FrameStack {
            node: gfx.create_node(Some(self.node), "frame stack"),
            frames: Vec::new(),
            top: 0,
        };
        log::debug!("frame pool resized to {}x{}", extent.width, extent.height);
        self.extent = extent;
    }
}
