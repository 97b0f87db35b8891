use std::any::Any;

use crate::coords::Extent;
use crate::paint::Color;

use super::GpuError;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);
    };
}

handle!(
    /// Opaque buffer handle (vertex or uniform data).
    BufferId
);
handle!(
    /// Opaque RGBA8 texture handle.
    TextureId
);
handle!(
    /// Opaque framebuffer handle; holds at most one color attachment.
    FramebufferId
);
handle!(
    /// Opaque vertex-array handle; records which buffer feeds position data.
    VertexArrayId
);
handle!(
    /// Opaque linked-program handle.
    ProgramId
);

/// Uniform slot holding the `mat4x4<f32>` transform.
pub const MATRIX_SLOT: u32 = 0;
/// Uniform slot holding the brush/effect parameter block (`vec4<f32>` color).
pub const PARAMS_SLOT: u32 = 1;
/// Texture slot sampled by output effects.
pub const INPUT_TEXTURE_SLOT: u32 = 0;

/// Bytes per vertex: one `vec2<f32>` position.
pub const VERTEX_STRIDE: usize = 8;

/// Where draws land.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Target {
    /// The presentable surface (back buffer).
    #[default]
    Surface,
    /// Whatever texture is attached to the framebuffer.
    Framebuffer(FramebufferId),
}

/// Primitive assembly for [`Backend::draw`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Primitive {
    Triangles,
    /// Closed outline through the vertices, `width` in pixels.
    LineLoop { width: f32 },
}

/// Fragment stage of a program.
///
/// WGSL backends compile [`ProgramDesc::source`]; the software backend
/// evaluates the shading rule directly. Both must agree.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Shading {
    /// `params.color`
    Uniform,
    /// `texture(input)` at the fragment's pixel
    Sampled,
    /// `texture(input) * params.color`
    SampledTinted,
}

impl Shading {
    /// Whether the program reads the input texture slot.
    ///
    /// A bound input that is also the render target is an error only for
    /// programs that sample; every backend applies this same rule.
    #[inline]
    pub fn samples(self) -> bool {
        !matches!(self, Shading::Uniform)
    }
}

/// Static description of a shader program kind.
#[derive(Debug)]
pub struct ProgramDesc {
    pub label: &'static str,
    /// WGSL source with `vs_main` / `fs_main` entry points.
    pub source: &'static str,
    pub shading: Shading,
}

/// Direct-state-access GPU primitive interface.
///
/// Handles are plain ids; every `create_*` has a matching `delete_*`, which
/// the resource tree calls from teardown hooks. Binding state (`set_target`,
/// `use_program`, `bind_*`) persists until changed.
pub trait Backend: Send + Any {
    // ── buffers ───────────────────────────────────────────────────────────
    fn create_buffer(&mut self, label: &'static str) -> Result<BufferId, GpuError>;
    /// Replaces the whole contents (reallocating when needed).
    fn buffer_data(&mut self, buffer: BufferId, data: &[u8]) -> Result<(), GpuError>;
    /// Overwrites `data.len()` bytes at `offset`.
    fn buffer_sub_data(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<(), GpuError>;
    fn delete_buffer(&mut self, buffer: BufferId);

    // ── textures / framebuffers ───────────────────────────────────────────
    fn create_texture(&mut self, label: &'static str, extent: Extent) -> Result<TextureId, GpuError>;
    fn delete_texture(&mut self, texture: TextureId);
    fn create_framebuffer(&mut self, label: &'static str) -> Result<FramebufferId, GpuError>;
    fn attach_color(&mut self, framebuffer: FramebufferId, texture: Option<TextureId>) -> Result<(), GpuError>;
    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    // ── vertex arrays ─────────────────────────────────────────────────────
    fn create_vertex_array(&mut self, label: &'static str) -> Result<VertexArrayId, GpuError>;
    fn vertex_array_buffer(&mut self, vertex_array: VertexArrayId, buffer: BufferId) -> Result<(), GpuError>;
    fn use_vertex_array(&mut self, vertex_array: VertexArrayId);
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);

    // ── programs ──────────────────────────────────────────────────────────
    fn create_program(&mut self, desc: &'static ProgramDesc) -> Result<ProgramId, GpuError>;
    fn use_program(&mut self, program: ProgramId);
    fn delete_program(&mut self, program: ProgramId);

    // ── state + draws ─────────────────────────────────────────────────────
    fn set_target(&mut self, target: Target);
    fn target(&self) -> Target;
    /// Size of the current target; empty when nothing is attached.
    fn target_extent(&self) -> Extent;
    fn clear(&mut self, color: Color) -> Result<(), GpuError>;
    fn bind_uniform(&mut self, slot: u32, buffer: BufferId);
    fn bind_texture(&mut self, slot: u32, texture: TextureId);
    /// Leaves `slot` with no texture bound.
    fn unbind_texture(&mut self, slot: u32);
    fn draw(&mut self, primitive: Primitive, first: u32, count: u32) -> Result<(), GpuError>;

    // ── surface ───────────────────────────────────────────────────────────
    fn surface_extent(&self) -> Extent;
    fn resize_surface(&mut self, extent: Extent);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
