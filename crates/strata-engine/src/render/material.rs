use crate::gpu::{Buffer, GpuError, GraphicsContext, ProgramDesc, SharedProgram, PARAMS_SLOT};
use crate::paint::Color;
use crate::resource::ResourceId;

/// A shared program plus this instance's own parameter block.
///
/// The program belongs to the context's shared backing; the parameter buffer
/// belongs to the material's node. If the shared program has been released
/// (new context generation), [`apply`](Self::apply) fetches a fresh one.
#[derive(Debug)]
pub struct Material {
    desc: &'static ProgramDesc,
    program: SharedProgram,
    params: Option<Buffer>,
    node: ResourceId,
}

impl Material {
    /// Builds an unowned material. Fails if the program cannot be built or
    /// the parameter buffer cannot be allocated; nothing is left behind.
    pub fn new(
        gfx: &mut GraphicsContext,
        label: &'static str,
        desc: &'static ProgramDesc,
        color: Option<Color>,
    ) -> Result<Self, GpuError> {
        let program = gfx.shared_program(desc)?;
        gfx.build(None, label, |gfx, node| {
            let params = match color {
                Some(c) => Some(gfx.create_buffer_with(node, "material params", bytemuck::bytes_of(&c))?),
                None => None,
            };
            Ok(Self {
                desc,
                program,
                params,
                node,
            })
        })
    }

    #[inline]
    pub fn node(&self) -> ResourceId {
        self.node
    }

    #[inline]
    pub fn program(&self) -> SharedProgram {
        self.program
    }

    /// Overwrites the color in the parameter block. No-op for materials
    /// without parameters.
    pub fn set_color(&mut self, gfx: &mut GraphicsContext, color: Color) -> Result<(), GpuError> {
        color.debug_assert_premul();
        match self.params {
            Some(p) => gfx.backend().buffer_sub_data(p.id, 0, bytemuck::bytes_of(&color)),
            None => Ok(()),
        }
    }

    /// Makes this material current: program plus parameter binding.
    pub fn apply(&mut self, gfx: &mut GraphicsContext) -> Result<(), GpuError> {
        if !gfx.is_live(self.program.node) {
            self.program = gfx.shared_program(self.desc)?;
        }
        let backend = gfx.backend();
        backend.use_program(self.program.id);
        if let Some(p) = self.params {
            backend.bind_uniform(PARAMS_SLOT, p.id);
        }
        Ok(())
    }
}
