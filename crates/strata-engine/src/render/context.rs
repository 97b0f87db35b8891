use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Mat4;

use crate::coords::Extent;
use crate::gpu::{Buffer, GpuError, GraphicsContext, VertexArray, MATRIX_SLOT};
use crate::resource::ResourceId;

use super::config::RenderConfig;
use super::frames::FramePool;
use super::matrix::MatrixStack;

/// Identity of a [`RenderContext`], stored in the thread-local slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: Cell<Option<ContextId>> = const { Cell::new(None) };
}

/// Per-thread render state: the shared vertex array, the transform uniform,
/// the transform stack and the offscreen frame pool.
#[derive(Debug)]
pub struct RenderContext {
    id: ContextId,
    node: ResourceId,
    pub(crate) vertex_array: VertexArray,
    pub(crate) matrix: Buffer,
    /// Identity transform used for blits, whose quads are already in NDC.
    pub(crate) unit_matrix: Buffer,
    pub(crate) quad: Buffer,
    pub(crate) frames: FramePool,
    matrices: MatrixStack,
}

impl RenderContext {
    pub fn new(
        gfx: &mut GraphicsContext,
        owner: Option<ResourceId>,
        config: &RenderConfig,
    ) -> Result<Self, GpuError> {
        gfx.build(owner, "render context", |gfx, node| {
            let identity = bytemuck::bytes_of(&Mat4::IDENTITY.to_cols_array()).to_vec();

            let vertex_array = gfx.create_vertex_array(node, "render context vertex array")?;
            let matrix = gfx.create_buffer_with(node, "transform uniform", &identity)?;
            let unit_matrix = gfx.create_buffer_with(node, "identity uniform", &identity)?;
            let quad = gfx.create_buffer(node, "blit quad")?;
            let frames = FramePool::new(gfx, Some(node), config.frame_extent, config.offscreen_clear)?;

            Ok(Self {
                id: ContextId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
                node,
                vertex_array,
                matrix,
                unit_matrix,
                quad,
                frames,
                matrices: MatrixStack::new(),
            })
        })
    }

    #[inline]
    pub fn id(&self) -> ContextId {
        self.id
    }

    #[inline]
    pub fn node(&self) -> ResourceId {
        self.node
    }

    /// Context bound on the calling thread, if any.
    pub fn current() -> Option<ContextId> {
        CURRENT.with(Cell::get)
    }

    #[inline]
    pub fn is_current(&self) -> bool {
        Self::current() == Some(self.id)
    }

    /// Marks this context current on the calling thread until the returned
    /// guard is dropped.
    ///
    /// Panics if any context is already current on this thread.
    pub fn bind(&self) -> ContextBinding {
        CURRENT.with(|c| {
            if let Some(other) = c.get() {
                panic!("RenderContext::bind: {other:?} is already current on this thread");
            }
            c.set(Some(self.id));
        });
        log::trace!("render context {:?} bound", self.id);
        ContextBinding {
            id: self.id,
            _not_send: PhantomData,
        }
    }

    // ── transforms ────────────────────────────────────────────────────────

    #[inline]
    pub fn push_matrix(&mut self, m: Mat4) {
        self.matrices.push(m);
    }

    #[inline]
    pub fn pop_matrix(&mut self) {
        self.matrices.pop();
    }

    #[inline]
    pub fn top_matrix(&self) -> Mat4 {
        self.matrices.top()
    }

    #[inline]
    pub fn matrix_depth(&self) -> usize {
        self.matrices.depth()
    }

    /// Uploads the top of the stack to the transform uniform.
    pub fn flush_matrix(&self, gfx: &mut GraphicsContext) -> Result<(), GpuError> {
        let cols = self.matrices.top().to_cols_array();
        gfx.backend().buffer_sub_data(self.matrix.id, 0, bytemuck::bytes_of(&cols))
    }

    /// Binds the transform uniform to its slot.
    pub fn bind_matrix(&self, gfx: &mut GraphicsContext) {
        gfx.backend().bind_uniform(MATRIX_SLOT, self.matrix.id);
    }

    // ── frames ────────────────────────────────────────────────────────────

    #[inline]
    pub fn frames(&self) -> &FramePool {
        &self.frames
    }

    /// Resizes the frame pool; pooled frames are discarded.
    pub fn resize(&mut self, gfx: &mut GraphicsContext, extent: Extent) {
        self.frames.resize(gfx, extent);
    }
}

/// Keeps a [`RenderContext`] current on this thread; unbinds on drop.
#[must_use = "the context is unbound when the binding is dropped"]
#[derive(Debug)]
pub struct ContextBinding {
    id: ContextId,
    // Thread-local state: the guard must be dropped on the thread that bound it.
    _not_send: PhantomData<*const ()>,
}

impl ContextBinding {
    #[inline]
    pub fn id(&self) -> ContextId {
        self.id
    }
}

impl Drop for ContextBinding {
    fn drop(&mut self) {
        CURRENT.with(|c| {
            if c.get() == Some(self.id) {
                c.set(None);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::SoftwareBackend;

    fn setup() -> (GraphicsContext, RenderContext) {
        let mut gfx = GraphicsContext::new(Box::new(SoftwareBackend::new(Extent::new(4, 4))));
        let vrc = RenderContext::new(&mut gfx, None, &RenderConfig::default()).unwrap();
        (gfx, vrc)
    }

    // ── binding ───────────────────────────────────────────────────────────

    #[test]
    fn bind_sets_and_drop_clears_current() {
        let (_gfx, vrc) = setup();
        assert_eq!(RenderContext::current(), None);
        {
            let binding = vrc.bind();
            assert_eq!(binding.id(), vrc.id());
            assert!(vrc.is_current());
        }
        assert_eq!(RenderContext::current(), None);
    }

    #[test]
    #[should_panic(expected = "already current")]
    fn nested_bind_panics() {
        let (_gfx, vrc) = setup();
        let _outer = vrc.bind();
        let _inner = vrc.bind();
    }

    #[test]
    fn binding_is_invisible_to_other_threads() {
        let (_gfx, vrc) = setup();
        let _binding = vrc.bind();
        let seen = std::thread::spawn(RenderContext::current).join().unwrap();
        assert_eq!(seen, None);
        assert!(vrc.is_current());
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn construction_failure_leaves_nothing_behind() {
        let mut gfx = GraphicsContext::new(Box::new(SoftwareBackend::new(Extent::new(4, 4))));
        gfx.backend_as_mut::<SoftwareBackend>().unwrap().fail_after(3);
        assert!(RenderContext::new(&mut gfx, None, &RenderConfig::default()).is_err());
        assert_eq!(gfx.backend_as::<SoftwareBackend>().unwrap().live_objects(), 0);
    }

    #[test]
    fn flush_uploads_the_top_matrix() {
        let (mut gfx, mut vrc) = setup();
        let uploaded = |gfx: &GraphicsContext, id| -> Vec<u8> {
            gfx.backend_as::<SoftwareBackend>().unwrap().buffer(id).unwrap()[..64].to_vec()
        };

        vrc.push_matrix(Mat4::from_scale(glam::Vec3::new(2.0, 2.0, 1.0)));
        vrc.push_matrix(Mat4::from_translation(glam::Vec3::new(0.25, 0.0, 0.0)));
        vrc.flush_matrix(&mut gfx).unwrap();
        let top = vrc.top_matrix().to_cols_array();
        assert_eq!(uploaded(&gfx, vrc.matrix.id), bytemuck::bytes_of(&top));

        vrc.pop_matrix();
        vrc.pop_matrix();
        vrc.flush_matrix(&mut gfx).unwrap();
        let identity = Mat4::IDENTITY.to_cols_array();
        assert_eq!(uploaded(&gfx, vrc.matrix.id), bytemuck::bytes_of(&identity));
        assert_eq!(uploaded(&gfx, vrc.unit_matrix.id), bytemuck::bytes_of(&identity));
        assert_eq!(vrc.matrix_depth(), 0);
    }
}
