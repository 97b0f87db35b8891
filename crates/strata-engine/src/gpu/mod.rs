//! GPU primitive layer.
//!
//! [`Backend`] is a small direct-state-access interface over buffers,
//! textures, framebuffers, vertex arrays and programs. Two implementations:
//! - [`WgpuBackend`] drives a real device through wgpu
//! - [`SoftwareBackend`] rasterizes on the CPU and is used headless
//!
//! [`GraphicsContext`] registers every object it creates in a
//! [`ResourceTree`](crate::resource::ResourceTree) so teardown is ordered and
//! happens exactly once.

mod backend;
mod context;
mod error;
mod hardware;
mod raster;
mod software;

pub use backend::{
    Backend, BufferId, FramebufferId, Primitive, ProgramDesc, ProgramId, Shading, Target,
    TextureId, VertexArrayId, INPUT_TEXTURE_SLOT, MATRIX_SLOT, PARAMS_SLOT, VERTEX_STRIDE,
};
pub use context::{Buffer, Framebuffer, GraphicsContext, SharedProgram, Texture, VertexArray};
pub use error::GpuError;
pub use hardware::{WgpuBackend, OFFSCREEN_FORMAT};
pub use software::{Pixmap, SoftwareBackend, SoftwareStats};
