use std::any::Any;
use std::collections::HashMap;

use glam::{Mat4, Vec4};

use crate::coords::{Extent, Vec2};
use crate::paint::Color;

use super::backend::{
    Backend, BufferId, FramebufferId, Primitive, ProgramDesc, ProgramId, Target, TextureId,
    VertexArrayId, INPUT_TEXTURE_SLOT, MATRIX_SLOT, PARAMS_SLOT, VERTEX_STRIDE,
};
use super::raster;
use super::GpuError;

/// Color format of offscreen textures.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const MIN_BUFFER_SIZE: u64 = 64;

// ── blend ─────────────────────────────────────────────────────────────────

fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

// ── objects ───────────────────────────────────────────────────────────────

struct HwBuffer {
    label: &'static str,
    /// CPU copy of the contents; line loops are expanded from it.
    shadow: Vec<u8>,
    gpu: Option<wgpu::Buffer>,
    capacity: u64,
}

struct HwTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    extent: Extent,
}

struct HwProgram {
    desc: &'static ProgramDesc,
    module: wgpu::ShaderModule,
}

#[derive(Debug, Default)]
struct BindState {
    target: Target,
    program: Option<ProgramId>,
    vertex_array: Option<VertexArrayId>,
    uniforms: [Option<BufferId>; 2],
    texture: Option<TextureId>,
}

/// [`Backend`] over a wgpu device.
///
/// Emulates an immediate-mode API: every clear and draw records its own
/// render pass and is submitted right away, so buffer updates issued between
/// draws land in order. The surface texture of the current frame is handed
/// in with [`attach_surface`](Self::attach_surface).
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    surface_extent: Extent,
    surface_view: Option<wgpu::TextureView>,

    next_id: u32,
    buffers: HashMap<BufferId, HwBuffer>,
    textures: HashMap<TextureId, HwTexture>,
    framebuffers: HashMap<FramebufferId, Option<TextureId>>,
    vertex_arrays: HashMap<VertexArrayId, Option<BufferId>>,
    programs: HashMap<ProgramId, HwProgram>,
    pipelines: HashMap<(ProgramId, wgpu::TextureFormat), wgpu::RenderPipeline>,

    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    fallback_uniform: wgpu::Buffer,
    fallback_view: wgpu::TextureView,
    identity: wgpu::Buffer,
    stroke_vbo: Option<(wgpu::Buffer, u64)>,

    state: BindState,
}

impl WgpuBackend {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        surface_extent: Extent,
    ) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("strata bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("strata pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let fallback_uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("strata fallback uniform"),
            size: MIN_BUFFER_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let fallback_view = device
            .create_texture(&offscreen_descriptor("strata fallback texture", Extent::new(1, 1)))
            .create_view(&wgpu::TextureViewDescriptor::default());

        let identity = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("strata identity matrix"),
            size: MIN_BUFFER_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&identity, 0, bytemuck::bytes_of(&Mat4::IDENTITY.to_cols_array()));

        Self {
            device,
            queue,
            surface_format,
            surface_extent,
            surface_view: None,
            next_id: 1,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            programs: HashMap::new(),
            pipelines: HashMap::new(),
            bind_group_layout,
            pipeline_layout,
            fallback_uniform,
            fallback_view,
            identity,
            stroke_vbo: None,
            state: BindState::default(),
        }
    }

    /// Makes `view` (the current frame's surface texture) the surface target.
    pub fn attach_surface(&mut self, view: wgpu::TextureView) {
        self.surface_view = Some(view);
    }

    /// Drops the surface view so the frame can be presented.
    pub fn detach_surface(&mut self) -> Option<wgpu::TextureView> {
        self.surface_view.take()
    }

    #[inline]
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn target_view(&self) -> Result<(wgpu::TextureView, wgpu::TextureFormat, Option<TextureId>), GpuError> {
        match self.state.target {
            Target::Surface => self
                .surface_view
                .clone()
                .map(|v| (v, self.surface_format, None))
                .ok_or(GpuError::NoTarget),
            Target::Framebuffer(fb) => {
                let attached = self
                    .framebuffers
                    .get(&fb)
                    .ok_or(GpuError::InvalidHandle { what: "framebuffer" })?
                    .ok_or(GpuError::NoTarget)?;
                let tex = self
                    .textures
                    .get(&attached)
                    .ok_or(GpuError::InvalidHandle { what: "texture" })?;
                Ok((tex.view.clone(), OFFSCREEN_FORMAT, Some(attached)))
            }
        }
    }

    fn gpu_buffer(&self, id: BufferId) -> Result<&wgpu::Buffer, GpuError> {
        self.buffers
            .get(&id)
            .and_then(|b| b.gpu.as_ref())
            .ok_or(GpuError::InvalidHandle { what: "buffer" })
    }

    fn pipeline(&mut self, program: ProgramId, format: wgpu::TextureFormat) -> Result<wgpu::RenderPipeline, GpuError> {
        if let Some(p) = self.pipelines.get(&(program, format)) {
            return Ok(p.clone());
        }

        let hw = self
            .programs
            .get(&program)
            .ok_or(GpuError::InvalidHandle { what: "program" })?;

        let attrs = wgpu::vertex_attr_array![0 => Float32x2];
        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(hw.desc.label),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &hw.module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: VERTEX_STRIDE as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attrs,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &hw.module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("pipeline for `{}` built for {format:?}", hw.desc.label);
        self.pipelines.insert((program, format), pipeline.clone());
        Ok(pipeline)
    }

    fn shadow(&self, id: Option<BufferId>, what: &'static str) -> Result<&[u8], GpuError> {
        let id = id.ok_or_else(|| GpuError::validation(format!("no {what} bound")))?;
        self.buffers
            .get(&id)
            .map(|b| b.shadow.as_slice())
            .ok_or(GpuError::InvalidHandle { what })
    }

    /// Expands a thick line loop to triangles in NDC, ready to draw with the
    /// identity matrix.
    fn expand_line_loop(
        &mut self,
        vertex_buffer: BufferId,
        first: u32,
        count: u32,
        width: f32,
        extent: Extent,
    ) -> Result<u32, GpuError> {
        let matrix = self.shadow(self.state.uniforms[MATRIX_SLOT as usize], "matrix uniform")?;
        if matrix.len() < 64 {
            return Err(GpuError::validation("matrix uniform is smaller than 64 bytes"));
        }
        let mvp = Mat4::from_cols_array(&bytemuck::pod_read_unaligned::<[f32; 16]>(&matrix[..64]));

        let bytes = self.shadow(Some(vertex_buffer), "vertex buffer")?;
        let start = first as usize * VERTEX_STRIDE;
        let end = start + count as usize * VERTEX_STRIDE;
        if end > bytes.len() {
            return Err(GpuError::validation("line loop reads past the end of its vertex buffer"));
        }

        let points: Vec<Vec2> = bytes[start..end]
            .chunks_exact(VERTEX_STRIDE)
            .map(|c| {
                let p: Vec2 = bytemuck::pod_read_unaligned(c);
                let clip = mvp * Vec4::new(p.x, p.y, 0.0, 1.0);
                let w = if clip.w.abs() > f32::EPSILON { clip.w } else { 1.0 };
                extent.ndc_to_pixel(Vec2::new(clip.x / w, clip.y / w))
            })
            .collect();

        let triangles: Vec<Vec2> = raster::line_loop_quads(&points, width)
            .into_iter()
            .flat_map(|q| [q[0], q[1], q[2], q[0], q[2], q[3]])
            .map(|p| extent.pixel_to_ndc(p))
            .collect();

        let size = (triangles.len() * VERTEX_STRIDE) as u64;
        if size == 0 {
            return Ok(0);
        }
        let needs_grow = self.stroke_vbo.as_ref().is_none_or(|(_, cap)| *cap < size);
        if needs_grow {
            let capacity = size.next_power_of_two().max(MIN_BUFFER_SIZE);
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("strata stroke vertices"),
                size: capacity,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.stroke_vbo = Some((buffer, capacity));
        }
        if let Some((buffer, _)) = &self.stroke_vbo {
            self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(&triangles));
        }
        Ok(triangles.len() as u32)
    }

    fn submit_pass(&self, label: &'static str, view: &wgpu::TextureView, load: wgpu::LoadOp<wgpu::Color>, record: impl FnOnce(&mut wgpu::RenderPass<'_>)) {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("strata encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            record(&mut rpass);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

fn offscreen_descriptor(label: &'static str, extent: Extent) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: extent.width.max(1),
            height: extent.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    }
}

/// `wgpu::Queue::write_buffer` needs 4-byte aligned sizes.
fn padded(data: &[u8]) -> std::borrow::Cow<'_, [u8]> {
    let rem = data.len() % wgpu::COPY_BUFFER_ALIGNMENT as usize;
    if rem == 0 {
        return data.into();
    }
    let mut v = data.to_vec();
    v.resize(data.len() + (wgpu::COPY_BUFFER_ALIGNMENT as usize - rem), 0);
    v.into()
}

impl Backend for WgpuBackend {
    fn create_buffer(&mut self, label: &'static str) -> Result<BufferId, GpuError> {
        let id = BufferId(self.allocate());
        self.buffers.insert(
            id,
            HwBuffer {
                label,
                shadow: Vec::new(),
                gpu: None,
                capacity: 0,
            },
        );
        Ok(id)
    }

    fn buffer_data(&mut self, buffer: BufferId, data: &[u8]) -> Result<(), GpuError> {
        let hw = self
            .buffers
            .get_mut(&buffer)
            .ok_or(GpuError::InvalidHandle { what: "buffer" })?;
        let needed = (data.len() as u64).max(MIN_BUFFER_SIZE);
        if hw.gpu.is_none() || hw.capacity < needed {
            let capacity = needed.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
            hw.gpu = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(hw.label),
                size: capacity,
                usage: wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            hw.capacity = capacity;
        }
        hw.shadow.clear();
        hw.shadow.extend_from_slice(data);
        if let Some(gpu) = &hw.gpu {
            if !data.is_empty() {
                self.queue.write_buffer(gpu, 0, &padded(data));
            }
        }
        Ok(())
    }

    fn buffer_sub_data(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<(), GpuError> {
        let hw = self
            .buffers
            .get_mut(&buffer)
            .ok_or(GpuError::InvalidHandle { what: "buffer" })?;
        let end = offset + data.len();
        if end > hw.shadow.len() || offset % wgpu::COPY_BUFFER_ALIGNMENT as usize != 0 {
            return Err(GpuError::validation(format!(
                "sub-data write {offset}..{end} does not fit buffer `{}` of {} bytes",
                hw.label,
                hw.shadow.len()
            )));
        }
        hw.shadow[offset..end].copy_from_slice(data);
        if let Some(gpu) = &hw.gpu {
            self.queue.write_buffer(gpu, offset as u64, &padded(data));
        }
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(hw) = self.buffers.remove(&buffer) {
            if let Some(gpu) = hw.gpu {
                gpu.destroy();
            }
        }
        for slot in &mut self.state.uniforms {
            if *slot == Some(buffer) {
                *slot = None;
            }
        }
    }

    fn create_texture(&mut self, label: &'static str, extent: Extent) -> Result<TextureId, GpuError> {
        if extent.is_empty() {
            return Err(GpuError::validation("texture extent must be non-zero"));
        }
        let limit = self.device.limits().max_texture_dimension_2d;
        if extent.width > limit || extent.height > limit {
            return Err(GpuError::OutOfMemory { what: label });
        }
        let texture = self.device.create_texture(&offscreen_descriptor(label, extent));
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = TextureId(self.allocate());
        self.textures.insert(
            id,
            HwTexture {
                texture,
                view,
                extent,
            },
        );
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(hw) = self.textures.remove(&texture) {
            hw.texture.destroy();
        }
        for attached in self.framebuffers.values_mut() {
            if *attached == Some(texture) {
                *attached = None;
            }
        }
        if self.state.texture == Some(texture) {
            self.state.texture = None;
        }
    }

    fn create_framebuffer(&mut self, _label: &'static str) -> Result<FramebufferId, GpuError> {
        let id = FramebufferId(self.allocate());
        self.framebuffers.insert(id, None);
        Ok(id)
    }

    fn attach_color(&mut self, framebuffer: FramebufferId, texture: Option<TextureId>) -> Result<(), GpuError> {
        if let Some(t) = texture {
            if !self.textures.contains_key(&t) {
                return Err(GpuError::InvalidHandle { what: "texture" });
            }
        }
        let slot = self
            .framebuffers
            .get_mut(&framebuffer)
            .ok_or(GpuError::InvalidHandle { what: "framebuffer" })?;
        *slot = texture;
        Ok(())
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.framebuffers.remove(&framebuffer);
        if self.state.target == Target::Framebuffer(framebuffer) {
            self.state.target = Target::Surface;
        }
    }

    fn create_vertex_array(&mut self, _label: &'static str) -> Result<VertexArrayId, GpuError> {
        let id = VertexArrayId(self.allocate());
        self.vertex_arrays.insert(id, None);
        Ok(id)
    }

    fn vertex_array_buffer(&mut self, vertex_array: VertexArrayId, buffer: BufferId) -> Result<(), GpuError> {
        if !self.buffers.contains_key(&buffer) {
            return Err(GpuError::InvalidHandle { what: "buffer" });
        }
        let slot = self
            .vertex_arrays
            .get_mut(&vertex_array)
            .ok_or(GpuError::InvalidHandle { what: "vertex array" })?;
        *slot = Some(buffer);
        Ok(())
    }

    fn use_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.state.vertex_array = Some(vertex_array);
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_arrays.remove(&vertex_array);
        if self.state.vertex_array == Some(vertex_array) {
            self.state.vertex_array = None;
        }
    }

    fn create_program(&mut self, desc: &'static ProgramDesc) -> Result<ProgramId, GpuError> {
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });

        let info = pollster::block_on(module.get_compilation_info());
        let errors: Vec<String> = info
            .messages
            .iter()
            .filter(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error))
            .map(|m| m.message.clone())
            .collect();
        if !errors.is_empty() {
            log::error!("program `{}` failed to compile: {}", desc.label, errors.join("; "));
            return Err(GpuError::ProgramLink {
                label: desc.label,
                reason: errors.join("; "),
            });
        }

        let id = ProgramId(self.allocate());
        self.programs.insert(id, HwProgram { desc, module });
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) {
        self.state.program = Some(program);
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        self.pipelines.retain(|(p, _), _| *p != program);
        if self.state.program == Some(program) {
            self.state.program = None;
        }
    }

    fn set_target(&mut self, target: Target) {
        self.state.target = target;
    }

    fn target(&self) -> Target {
        self.state.target
    }

    fn target_extent(&self) -> Extent {
        match self.state.target {
            Target::Surface => self.surface_extent,
            Target::Framebuffer(fb) => self
                .framebuffers
                .get(&fb)
                .copied()
                .flatten()
                .and_then(|t| self.textures.get(&t))
                .map(|t| t.extent)
                .unwrap_or_default(),
        }
    }

    fn clear(&mut self, color: Color) -> Result<(), GpuError> {
        let (view, _, _) = self.target_view()?;
        self.submit_pass("strata clear", &view, wgpu::LoadOp::Clear(color.into()), |_| {});
        Ok(())
    }

    fn bind_uniform(&mut self, slot: u32, buffer: BufferId) {
        if let Some(s) = self.state.uniforms.get_mut(slot as usize) {
            *s = Some(buffer);
        }
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureId) {
        if slot == INPUT_TEXTURE_SLOT {
            self.state.texture = Some(texture);
        }
    }

    fn unbind_texture(&mut self, slot: u32) {
        if slot == INPUT_TEXTURE_SLOT {
            self.state.texture = None;
        }
    }

    fn draw(&mut self, primitive: Primitive, first: u32, count: u32) -> Result<(), GpuError> {
        let (view, format, target_texture) = match self.target_view() {
            Ok(t) => t,
            Err(GpuError::NoTarget) => {
                log::warn!("draw issued without a render target");
                return Err(GpuError::NoTarget);
            }
            Err(e) => return Err(e),
        };
        let program = self
            .state
            .program
            .ok_or_else(|| GpuError::validation("draw without a program"))?;
        let samples = self
            .programs
            .get(&program)
            .ok_or(GpuError::InvalidHandle { what: "program" })?
            .desc
            .shading
            .samples();
        // Programs that ignore the input get the fallback view, so a stale
        // binding never aliases the target.
        let input = if samples {
            let t = self
                .state
                .texture
                .ok_or_else(|| GpuError::validation("sampling program without an input texture"))?;
            Some(t)
        } else {
            None
        };
        if input.is_some() && input == target_texture {
            return Err(GpuError::validation("input texture is also the render target"));
        }
        let pipeline = self.pipeline(program, format)?;

        let vertex_buffer = self
            .state
            .vertex_array
            .and_then(|va| self.vertex_arrays.get(&va).copied().flatten())
            .ok_or_else(|| GpuError::validation("draw without a vertex buffer"))?;

        let (vertices, vbo, mvp) = match primitive {
            Primitive::Triangles => {
                let matrix = self.state.uniforms[MATRIX_SLOT as usize]
                    .ok_or_else(|| GpuError::validation("no matrix uniform bound"))?;
                (
                    first..first + count,
                    self.gpu_buffer(vertex_buffer)?.clone(),
                    self.gpu_buffer(matrix)?.clone(),
                )
            }
            Primitive::LineLoop { width } => {
                let extent = self.target_extent();
                let n = self.expand_line_loop(vertex_buffer, first, count, width, extent)?;
                let Some((vbo, _)) = self.stroke_vbo.as_ref().filter(|_| n > 0) else {
                    return Ok(());
                };
                (0..n, vbo.clone(), self.identity.clone())
            }
        };

        let params = match self.state.uniforms[PARAMS_SLOT as usize] {
            Some(id) => self.gpu_buffer(id)?.clone(),
            None => self.fallback_uniform.clone(),
        };
        let input = match input {
            Some(t) => self
                .textures
                .get(&t)
                .map(|t| t.view.clone())
                .ok_or(GpuError::InvalidHandle { what: "texture" })?,
            None => self.fallback_view.clone(),
        };

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("strata bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: mvp.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&input),
                },
            ],
        });

        log::trace!("wgpu draw {primitive:?} vertices={vertices:?}");
        self.submit_pass("strata draw", &view, wgpu::LoadOp::Load, |rpass| {
            rpass.set_pipeline(&pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.set_vertex_buffer(0, vbo.slice(..));
            rpass.draw(vertices, 0..1);
        });
        Ok(())
    }

    fn surface_extent(&self) -> Extent {
        self.surface_extent
    }

    fn resize_surface(&mut self, extent: Extent) {
        self.surface_extent = extent;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
