use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::coords::Extent;
use crate::resource::{ResourceId, ResourceTree};

use super::backend::{
    Backend, BufferId, FramebufferId, ProgramDesc, ProgramId, TextureId, VertexArrayId,
};
use super::GpuError;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// GPU buffer registered in the resource tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Buffer {
    pub id: BufferId,
    pub node: ResourceId,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Texture {
    pub id: TextureId,
    pub node: ResourceId,
    pub extent: Extent,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pub id: FramebufferId,
    pub node: ResourceId,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexArray {
    pub id: VertexArrayId,
    pub node: ResourceId,
}

/// Program owned by the shared backing of a [`GraphicsContext`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SharedProgram {
    pub id: ProgramId,
    pub node: ResourceId,
}

/// One generation of a graphics device.
///
/// Owns the backend, the resource tree every GPU object is registered in,
/// and the cache of shared programs (one per program kind). Shared programs
/// hang off a dedicated backing node; tearing that node down
/// ([`release_shared`](Self::release_shared)) starts a new generation and
/// the programs are rebuilt on next use.
pub struct GraphicsContext {
    backend: Box<dyn Backend>,
    tree: ResourceTree<dyn Backend>,
    shared: ResourceId,
    programs: HashMap<&'static str, SharedProgram>,
    generation: u64,
}

impl GraphicsContext {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        let mut tree = ResourceTree::new();
        let shared = tree.create("shared backing", None);
        let generation = next_generation();
        log::debug!("graphics context generation {generation} created");
        Self {
            backend,
            tree,
            shared,
            programs: HashMap::new(),
            generation,
        }
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn backend(&mut self) -> &mut dyn Backend {
        self.backend.as_mut()
    }

    /// Concrete backend, when it is a `B`.
    pub fn backend_as<B: Backend>(&self) -> Option<&B> {
        self.backend.as_any().downcast_ref::<B>()
    }

    pub fn backend_as_mut<B: Backend>(&mut self) -> Option<&mut B> {
        self.backend.as_any_mut().downcast_mut::<B>()
    }

    #[inline]
    pub fn resources(&self) -> &ResourceTree<dyn Backend> {
        &self.tree
    }

    // ── ownership ─────────────────────────────────────────────────────────

    /// Registers a node with no GPU object of its own, grouping what it will
    /// own.
    pub fn create_node(&mut self, owner: Option<ResourceId>, label: &'static str) -> ResourceId {
        match owner {
            Some(owner) => self.tree.create_owned(owner, label, None),
            None => self.tree.create(label, None),
        }
    }

    /// Runs `f` against a fresh node. If `f` fails the node, and anything
    /// already attached to it, is released before the error is returned.
    pub fn build<T>(
        &mut self,
        owner: Option<ResourceId>,
        label: &'static str,
        f: impl FnOnce(&mut Self, ResourceId) -> Result<T, GpuError>,
    ) -> Result<T, GpuError> {
        let node = self.create_node(owner, label);
        match f(self, node) {
            Ok(value) => Ok(value),
            Err(err) => {
                log::debug!("building `{label}` failed, releasing partial resources: {err}");
                self.release(node);
                Err(err)
            }
        }
    }

    #[inline]
    pub fn inject(&mut self, owner: ResourceId, child: ResourceId) -> ResourceId {
        self.tree.inject(owner, child)
    }

    #[inline]
    pub fn reject(&mut self, owner: ResourceId, child: ResourceId, dispose_now: bool) {
        self.tree.reject(owner, child, dispose_now, self.backend.as_mut());
    }

    #[inline]
    pub fn release(&mut self, id: ResourceId) {
        self.tree.release(id, self.backend.as_mut());
    }

    #[inline]
    pub fn is_live(&self, id: ResourceId) -> bool {
        self.tree.is_live(id)
    }

    /// Releases every resource, shared programs included, and starts a new
    /// generation.
    pub fn release_all(&mut self) {
        self.release_everything();
        self.shared = self.tree.create("shared backing", None);
        self.generation = next_generation();
    }

    fn release_everything(&mut self) {
        self.programs.clear();
        let n = self.tree.release_all(self.backend.as_mut());
        if n > 0 {
            log::debug!("released {n} top-level resources");
        }
    }

    // ── GPU objects ───────────────────────────────────────────────────────

    pub fn create_buffer(&mut self, owner: ResourceId, label: &'static str) -> Result<Buffer, GpuError> {
        let id = self.backend.create_buffer(label)?;
        let node = self.tree.create_owned(
            owner,
            label,
            Some(Box::new(move |b: &mut dyn Backend| b.delete_buffer(id))),
        );
        Ok(Buffer { id, node })
    }

    /// Creates a buffer and uploads `data` into it.
    pub fn create_buffer_with(
        &mut self,
        owner: ResourceId,
        label: &'static str,
        data: &[u8],
    ) -> Result<Buffer, GpuError> {
        let buffer = self.create_buffer(owner, label)?;
        if let Err(err) = self.backend.buffer_data(buffer.id, data) {
            self.release(buffer.node);
            return Err(err);
        }
        Ok(buffer)
    }

    pub fn create_texture(
        &mut self,
        owner: ResourceId,
        label: &'static str,
        extent: Extent,
    ) -> Result<Texture, GpuError> {
        let id = self.backend.create_texture(label, extent)?;
        let node = self.tree.create_owned(
            owner,
            label,
            Some(Box::new(move |b: &mut dyn Backend| b.delete_texture(id))),
        );
        Ok(Texture { id, node, extent })
    }

    pub fn create_framebuffer(&mut self, owner: ResourceId, label: &'static str) -> Result<Framebuffer, GpuError> {
        let id = self.backend.create_framebuffer(label)?;
        let node = self.tree.create_owned(
            owner,
            label,
            Some(Box::new(move |b: &mut dyn Backend| b.delete_framebuffer(id))),
        );
        Ok(Framebuffer { id, node })
    }

    pub fn create_vertex_array(&mut self, owner: ResourceId, label: &'static str) -> Result<VertexArray, GpuError> {
        let id = self.backend.create_vertex_array(label)?;
        let node = self.tree.create_owned(
            owner,
            label,
            Some(Box::new(move |b: &mut dyn Backend| b.delete_vertex_array(id))),
        );
        Ok(VertexArray { id, node })
    }

    // ── shared programs ───────────────────────────────────────────────────

    /// The program for `desc`, created on first use and recreated when the
    /// cached one is no longer live.
    pub fn shared_program(&mut self, desc: &'static ProgramDesc) -> Result<SharedProgram, GpuError> {
        if let Some(p) = self.programs.get(desc.label) {
            if self.tree.is_live(p.node) {
                return Ok(*p);
            }
        }

        let id = self.backend.create_program(desc)?;
        let node = self.tree.create_owned(
            self.shared,
            desc.label,
            Some(Box::new(move |b: &mut dyn Backend| b.delete_program(id))),
        );
        log::debug!("program `{}` created for generation {}", desc.label, self.generation);

        let program = SharedProgram { id, node };
        self.programs.insert(desc.label, program);
        Ok(program)
    }

    /// Tears down every shared program and starts a new generation.
    pub fn release_shared(&mut self) {
        self.tree.release(self.shared, self.backend.as_mut());
        self.shared = self.tree.create("shared backing", None);
        self.programs.clear();
        self.generation = next_generation();
        log::debug!("shared backing released, now at generation {}", self.generation);
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        // The shared backing is the only resource expected to outlive users.
        let stray = self.tree.live_count().saturating_sub(1 + self.tree.owned(self.shared).len());
        if stray > 0 {
            log::warn!("graphics context dropped with {stray} unreleased resources; releasing them now");
        }
        self.release_everything();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{Shading, SoftwareBackend};

    static FLAT: ProgramDesc = ProgramDesc {
        label: "test flat",
        source: "fn vs_main() {} fn fs_main() {}",
        shading: Shading::Uniform,
    };

    fn gfx() -> GraphicsContext {
        GraphicsContext::new(Box::new(SoftwareBackend::new(Extent::new(4, 4))))
    }

    fn live_objects(gfx: &GraphicsContext) -> usize {
        gfx.backend_as::<SoftwareBackend>().unwrap().live_objects()
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn objects_are_deleted_with_their_owner() {
        let mut gfx = gfx();
        let owner = gfx.create_node(None, "owner");
        gfx.create_buffer(owner, "a").unwrap();
        gfx.create_texture(owner, "b", Extent::new(2, 2)).unwrap();
        gfx.create_framebuffer(owner, "c").unwrap();
        assert_eq!(live_objects(&gfx), 3);

        gfx.release(owner);
        assert_eq!(live_objects(&gfx), 0);
    }

    #[test]
    fn failed_build_releases_partial_objects() {
        let mut gfx = gfx();
        gfx.backend_as_mut::<SoftwareBackend>().unwrap().fail_after(2);

        let result = gfx.build(None, "composite", |gfx, node| {
            gfx.create_buffer(node, "first")?;
            gfx.create_buffer(node, "second")?;
            gfx.create_buffer(node, "third")?;
            Ok(node)
        });

        assert!(matches!(result, Err(GpuError::OutOfMemory { .. })));
        assert_eq!(live_objects(&gfx), 0);
        // Only the shared backing remains.
        assert_eq!(gfx.resources().live_count(), 1);
    }

    #[test]
    fn create_buffer_with_uploads_contents() {
        let mut gfx = gfx();
        let owner = gfx.create_node(None, "owner");
        let buffer = gfx.create_buffer_with(owner, "data", &[0; 16]).unwrap();
        assert!(gfx.backend().buffer_sub_data(buffer.id, 8, &[1; 8]).is_ok());
        assert!(gfx.backend().buffer_sub_data(buffer.id, 12, &[1; 8]).is_err());
        gfx.release(owner);
        assert_eq!(live_objects(&gfx), 0);
    }

    // ── shared programs ───────────────────────────────────────────────────

    #[test]
    fn shared_program_is_cached_per_kind() {
        let mut gfx = gfx();
        let a = gfx.shared_program(&FLAT).unwrap();
        let b = gfx.shared_program(&FLAT).unwrap();
        assert_eq!(a, b);
        assert_eq!(gfx.backend_as::<SoftwareBackend>().unwrap().live_programs(), 1);
    }

    #[test]
    fn released_program_is_recreated() {
        let mut gfx = gfx();
        let first = gfx.shared_program(&FLAT).unwrap();
        let generation = gfx.generation();

        gfx.release_shared();
        assert!(!gfx.is_live(first.node));
        assert_ne!(gfx.generation(), generation);

        let second = gfx.shared_program(&FLAT).unwrap();
        assert_ne!(first.id, second.id);
        assert!(gfx.is_live(second.node));
        assert_eq!(gfx.backend_as::<SoftwareBackend>().unwrap().live_programs(), 1);
    }

    #[test]
    fn contexts_do_not_share_programs() {
        let mut a = gfx();
        let mut b = gfx();
        a.shared_program(&FLAT).unwrap();
        b.shared_program(&FLAT).unwrap();
        assert_ne!(a.generation(), b.generation());
        assert_eq!(a.backend_as::<SoftwareBackend>().unwrap().live_programs(), 1);
        assert_eq!(b.backend_as::<SoftwareBackend>().unwrap().live_programs(), 1);
    }

    #[test]
    fn release_all_deletes_everything() {
        let mut gfx = gfx();
        let owner = gfx.create_node(None, "owner");
        gfx.create_vertex_array(owner, "va").unwrap();
        gfx.shared_program(&FLAT).unwrap();

        gfx.release_all();
        assert_eq!(live_objects(&gfx), 0);
        assert!(!gfx.is_live(owner));

        // A fresh backing is ready for the next generation.
        gfx.shared_program(&FLAT).unwrap();
        assert_eq!(live_objects(&gfx), 1);
    }
}
