use std::any::Any;
use std::collections::HashMap;

use glam::{Mat4, Vec4};

use crate::coords::{Extent, Vec2};
use crate::paint::Color;

use super::backend::{
    Backend, BufferId, FramebufferId, Primitive, ProgramDesc, ProgramId, Shading, Target,
    TextureId, VertexArrayId, INPUT_TEXTURE_SLOT, MATRIX_SLOT, PARAMS_SLOT, VERTEX_STRIDE,
};
use super::raster;
use super::GpuError;

/// CPU image with premultiplied `f32` texels.
#[derive(Debug, Clone)]
pub struct Pixmap {
    extent: Extent,
    texels: Vec<Color>,
}

impl Pixmap {
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            texels: vec![Color::TRANSPARENT; extent.pixel_count()],
        }
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Texel at `(x, y)`; `None` outside the image.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.extent.width || y >= self.extent.height {
            return None;
        }
        self.texels.get(self.index(x, y)).copied()
    }

    /// Nearest texel to a pixel centre, clamped to the edges.
    #[inline]
    fn sample(&self, x: u32, y: u32) -> Color {
        if self.extent.is_empty() {
            return Color::TRANSPARENT;
        }
        let x = x.min(self.extent.width - 1);
        let y = y.min(self.extent.height - 1);
        self.texels[self.index(x, y)]
    }

    fn fill(&mut self, color: Color) {
        self.texels.fill(color);
    }

    #[inline]
    fn blend(&mut self, x: u32, y: u32, src: Color) {
        let i = self.index(x, y);
        self.texels[i] = src.over(self.texels[i]);
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.extent.width as usize + x as usize
    }
}

#[derive(Debug, Default)]
struct BindState {
    target: Target,
    program: Option<ProgramId>,
    vertex_array: Option<VertexArrayId>,
    uniforms: [Option<BufferId>; 2],
    texture: Option<TextureId>,
}

/// Counters exposed for tests.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SoftwareStats {
    pub clears: u64,
    pub draws: u64,
}

/// Headless reference implementation of [`Backend`].
///
/// Rasterizes on the CPU at pixel centres, samples textures with the nearest
/// texel and blends with premultiplied source-over. Results are exact, so
/// renders can be compared pixel for pixel.
pub struct SoftwareBackend {
    surface: Pixmap,
    next_id: u32,

    buffers: HashMap<BufferId, Vec<u8>>,
    textures: HashMap<TextureId, Pixmap>,
    framebuffers: HashMap<FramebufferId, Option<TextureId>>,
    vertex_arrays: HashMap<VertexArrayId, Option<BufferId>>,
    programs: HashMap<ProgramId, &'static ProgramDesc>,

    state: BindState,
    allocation_budget: Option<usize>,
    stats: SoftwareStats,
}

impl SoftwareBackend {
    pub fn new(surface: Extent) -> Self {
        Self {
            surface: Pixmap::new(surface),
            next_id: 1,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            programs: HashMap::new(),
            state: BindState::default(),
            allocation_budget: None,
            stats: SoftwareStats::default(),
        }
    }

    /// Lets `n` more objects be created, then fails every creation with
    /// [`GpuError::OutOfMemory`].
    pub fn fail_after(&mut self, n: usize) {
        self.allocation_budget = Some(n);
    }

    /// Removes any allocation limit set by [`fail_after`](Self::fail_after).
    pub fn clear_failures(&mut self) {
        self.allocation_budget = None;
    }

    #[inline]
    pub fn surface(&self) -> &Pixmap {
        &self.surface
    }

    /// Surface pixel at `(x, y)`, origin top-left.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.surface.get(x, y)
    }

    pub fn texture(&self, texture: TextureId) -> Option<&Pixmap> {
        self.textures.get(&texture)
    }

    /// Current contents of `buffer`.
    pub fn buffer(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Texture bound to the input slot, if any.
    #[inline]
    pub fn bound_texture(&self) -> Option<TextureId> {
        self.state.texture
    }

    #[inline]
    pub fn stats(&self) -> SoftwareStats {
        self.stats
    }

    /// Number of objects created and not yet deleted, of every kind.
    pub fn live_objects(&self) -> usize {
        self.buffers.len()
            + self.textures.len()
            + self.framebuffers.len()
            + self.vertex_arrays.len()
            + self.programs.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    fn allocate(&mut self, what: &'static str) -> Result<u32, GpuError> {
        if let Some(budget) = self.allocation_budget.as_mut() {
            if *budget == 0 {
                log::debug!("software backend: refusing allocation of {what}");
                return Err(GpuError::OutOfMemory { what });
            }
            *budget -= 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }

    fn target_texture(&self) -> Result<Option<TextureId>, GpuError> {
        match self.state.target {
            Target::Surface => Ok(None),
            Target::Framebuffer(fb) => match self.framebuffers.get(&fb) {
                Some(Some(tex)) => Ok(Some(*tex)),
                Some(None) => Err(GpuError::NoTarget),
                None => Err(GpuError::InvalidHandle { what: "framebuffer" }),
            },
        }
    }

    fn uniform(&self, slot: u32) -> Result<&[u8], GpuError> {
        let buffer = self.state.uniforms[slot as usize]
            .ok_or_else(|| GpuError::validation(format!("no buffer bound to uniform slot {slot}")))?;
        self.buffers
            .get(&buffer)
            .map(Vec::as_slice)
            .ok_or(GpuError::InvalidHandle { what: "uniform buffer" })
    }

    fn matrix(&self) -> Result<Mat4, GpuError> {
        let bytes = self.uniform(MATRIX_SLOT)?;
        if bytes.len() < 64 {
            return Err(GpuError::validation("matrix uniform is smaller than 64 bytes"));
        }
        let cols: [f32; 16] = bytemuck::pod_read_unaligned(&bytes[..64]);
        Ok(Mat4::from_cols_array(&cols))
    }

    fn params(&self) -> Result<Color, GpuError> {
        let bytes = self.uniform(PARAMS_SLOT)?;
        if bytes.len() < 16 {
            return Err(GpuError::validation("params uniform is smaller than 16 bytes"));
        }
        Ok(bytemuck::pod_read_unaligned(&bytes[..16]))
    }

    fn vertices(&self, first: u32, count: u32) -> Result<Vec<Vec2>, GpuError> {
        let va = self
            .state
            .vertex_array
            .ok_or_else(|| GpuError::validation("draw without a vertex array"))?;
        let buffer = self
            .vertex_arrays
            .get(&va)
            .ok_or(GpuError::InvalidHandle { what: "vertex array" })?
            .ok_or_else(|| GpuError::validation("vertex array has no vertex buffer"))?;
        let bytes = self
            .buffers
            .get(&buffer)
            .ok_or(GpuError::InvalidHandle { what: "vertex buffer" })?;

        let start = first as usize * VERTEX_STRIDE;
        let end = start + count as usize * VERTEX_STRIDE;
        if end > bytes.len() {
            return Err(GpuError::validation(format!(
                "draw reads vertices {first}..{} past the end of a {}-byte buffer",
                first + count,
                bytes.len()
            )));
        }
        Ok(bytes[start..end]
            .chunks_exact(VERTEX_STRIDE)
            .map(bytemuck::pod_read_unaligned::<Vec2>)
            .collect())
    }

    fn target_pixmap_mut(&mut self, texture: Option<TextureId>) -> &mut Pixmap {
        match texture.and_then(|t| self.textures.get_mut(&t)) {
            Some(p) => p,
            None => &mut self.surface,
        }
    }
}

fn to_pixel(mvp: &Mat4, extent: Extent, p: Vec2) -> Vec2 {
    let clip = *mvp * Vec4::new(p.x, p.y, 0.0, 1.0);
    let w = if clip.w.abs() > f32::EPSILON { clip.w } else { 1.0 };
    extent.ndc_to_pixel(Vec2::new(clip.x / w, clip.y / w))
}

impl Backend for SoftwareBackend {
    fn create_buffer(&mut self, _label: &'static str) -> Result<BufferId, GpuError> {
        let id = BufferId(self.allocate("buffer")?);
        self.buffers.insert(id, Vec::new());
        Ok(id)
    }

    fn buffer_data(&mut self, buffer: BufferId, data: &[u8]) -> Result<(), GpuError> {
        let bytes = self
            .buffers
            .get_mut(&buffer)
            .ok_or(GpuError::InvalidHandle { what: "buffer" })?;
        bytes.clear();
        bytes.extend_from_slice(data);
        Ok(())
    }

    fn buffer_sub_data(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<(), GpuError> {
        let bytes = self
            .buffers
            .get_mut(&buffer)
            .ok_or(GpuError::InvalidHandle { what: "buffer" })?;
        let end = offset + data.len();
        if end > bytes.len() {
            return Err(GpuError::validation(format!(
                "sub-data write {offset}..{end} exceeds buffer size {}",
                bytes.len()
            )));
        }
        bytes[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        for slot in &mut self.state.uniforms {
            if *slot == Some(buffer) {
                *slot = None;
            }
        }
    }

    fn create_texture(&mut self, _label: &'static str, extent: Extent) -> Result<TextureId, GpuError> {
        if extent.is_empty() {
            return Err(GpuError::validation("texture extent must be non-zero"));
        }
        let id = TextureId(self.allocate("texture")?);
        self.textures.insert(id, Pixmap::new(extent));
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
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
        let id = FramebufferId(self.allocate("framebuffer")?);
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
        let id = VertexArrayId(self.allocate("vertex array")?);
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
        for entry in ["vs_main", "fs_main"] {
            if !desc.source.contains(entry) {
                return Err(GpuError::ProgramLink {
                    label: desc.label,
                    reason: format!("missing entry point `{entry}`"),
                });
            }
        }
        let id = ProgramId(self.allocate(desc.label)?);
        self.programs.insert(id, desc);
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) {
        self.state.program = Some(program);
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
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
        match self.target_texture() {
            Ok(Some(t)) => self.textures.get(&t).map(Pixmap::extent).unwrap_or_default(),
            Ok(None) => self.surface.extent(),
            Err(_) => Extent::default(),
        }
    }

    fn clear(&mut self, color: Color) -> Result<(), GpuError> {
        let texture = self.target_texture()?;
        self.target_pixmap_mut(texture).fill(color);
        self.stats.clears += 1;
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
        let texture = match self.target_texture() {
            Ok(t) => t,
            Err(GpuError::NoTarget) => {
                log::warn!("draw issued against a framebuffer without a color attachment");
                return Err(GpuError::NoTarget);
            }
            Err(e) => return Err(e),
        };

        let program = self
            .state
            .program
            .ok_or_else(|| GpuError::validation("draw without a program"))?;
        let shading = self
            .programs
            .get(&program)
            .ok_or(GpuError::InvalidHandle { what: "program" })?
            .shading;

        let tint = match shading {
            Shading::Uniform | Shading::SampledTinted => self.params()?,
            Shading::Sampled => Color::WHITE,
        };
        let input = if shading.samples() {
            let t = self
                .state
                .texture
                .ok_or_else(|| GpuError::validation("sampling program without an input texture"))?;
            if Some(t) == texture {
                return Err(GpuError::validation("input texture is also the render target"));
            }
            if !self.textures.contains_key(&t) {
                return Err(GpuError::InvalidHandle { what: "texture" });
            }
            Some(t)
        } else {
            None
        };

        let mvp = self.matrix()?;
        let extent = self.target_extent();
        let points: Vec<Vec2> = self
            .vertices(first, count)?
            .into_iter()
            .map(|p| to_pixel(&mvp, extent, p))
            .collect();

        // Coverage is collected first so overlapping stroke segments blend once.
        let mut covered = vec![false; extent.pixel_count()];
        let mut mark = |x: u32, y: u32| covered[y as usize * extent.width as usize + x as usize] = true;
        match primitive {
            Primitive::Triangles => {
                for tri in points.chunks_exact(3) {
                    raster::fill_triangle(extent, [tri[0], tri[1], tri[2]], &mut mark);
                }
            }
            Primitive::LineLoop { width } => {
                for q in raster::line_loop_quads(&points, width) {
                    raster::fill_triangle(extent, [q[0], q[1], q[2]], &mut mark);
                    raster::fill_triangle(extent, [q[0], q[2], q[3]], &mut mark);
                }
            }
        }

        log::trace!("software draw {primitive:?} first={first} count={count} shading={shading:?}");

        // The input is never the target, so it can sit outside the map while
        // the target is borrowed mutably.
        let source = input.and_then(|t| self.textures.remove(&t).map(|p| (t, p)));
        let dst = self.target_pixmap_mut(texture);
        for (i, _) in covered.iter().enumerate().filter(|(_, c)| **c) {
            let x = (i % extent.width as usize) as u32;
            let y = (i / extent.width as usize) as u32;
            let src = match &source {
                Some((_, tex)) => tex.sample(x, y).modulate(tint),
                None => tint,
            };
            dst.blend(x, y, src);
        }
        if let Some((t, pixmap)) = source {
            self.textures.insert(t, pixmap);
        }
        self.stats.draws += 1;
        Ok(())
    }

    fn surface_extent(&self) -> Extent {
        self.surface.extent()
    }

    fn resize_surface(&mut self, extent: Extent) {
        self.surface = Pixmap::new(extent);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FLAT: ProgramDesc = ProgramDesc {
        label: "flat",
        source: "fn vs_main() {} fn fs_main() {}",
        shading: Shading::Uniform,
    };

    static COPY: ProgramDesc = ProgramDesc {
        label: "copy",
        source: "fn vs_main() {} fn fs_main() {}",
        shading: Shading::Sampled,
    };

    static BROKEN: ProgramDesc = ProgramDesc {
        label: "broken",
        source: "fn vs_main() {}",
        shading: Shading::Uniform,
    };

    fn uniform(b: &mut SoftwareBackend, bytes: &[u8]) -> BufferId {
        let id = b.create_buffer("uniform").unwrap();
        b.buffer_data(id, bytes).unwrap();
        id
    }

    /// Backend with an identity matrix, a flat red program and a full-screen
    /// quad bound.
    fn flat_setup(extent: Extent) -> SoftwareBackend {
        let mut b = SoftwareBackend::new(extent);
        let m = uniform(&mut b, bytemuck::bytes_of(&Mat4::IDENTITY.to_cols_array()));
        let p = uniform(&mut b, bytemuck::bytes_of(&Color::opaque(1.0, 0.0, 0.0)));
        b.bind_uniform(MATRIX_SLOT, m);
        b.bind_uniform(PARAMS_SLOT, p);

        let quad = crate::coords::Rect::new(-1.0, -1.0, 1.0, 1.0).quad();
        let vb = uniform(&mut b, bytemuck::cast_slice(&quad));
        let va = b.create_vertex_array("va").unwrap();
        b.vertex_array_buffer(va, vb).unwrap();
        b.use_vertex_array(va);

        let prog = b.create_program(&FLAT).unwrap();
        b.use_program(prog);
        b
    }

    // ── drawing ───────────────────────────────────────────────────────────

    #[test]
    fn full_screen_quad_covers_every_pixel() {
        let mut b = flat_setup(Extent::new(5, 3));
        b.clear(Color::BLACK).unwrap();
        b.draw(Primitive::Triangles, 0, 6).unwrap();

        for y in 0..3 {
            for x in 0..5 {
                assert_eq!(b.pixel(x, y), Some(Color::opaque(1.0, 0.0, 0.0)));
            }
        }
        assert_eq!(b.stats(), SoftwareStats { clears: 1, draws: 1 });
    }

    #[test]
    fn draw_into_framebuffer_leaves_surface_untouched() {
        let mut b = flat_setup(Extent::new(4, 4));
        b.clear(Color::BLACK).unwrap();

        let tex = b.create_texture("frame", Extent::new(4, 4)).unwrap();
        let fb = b.create_framebuffer("fb").unwrap();
        b.attach_color(fb, Some(tex)).unwrap();
        b.set_target(Target::Framebuffer(fb));
        b.clear(Color::TRANSPARENT).unwrap();
        b.draw(Primitive::Triangles, 0, 6).unwrap();

        assert_eq!(b.pixel(1, 1), Some(Color::BLACK));
        assert_eq!(b.texture(tex).unwrap().get(1, 1), Some(Color::opaque(1.0, 0.0, 0.0)));
    }

    #[test]
    fn sampled_program_copies_texels() {
        let mut b = flat_setup(Extent::new(4, 4));
        let tex = b.create_texture("frame", Extent::new(4, 4)).unwrap();
        let fb = b.create_framebuffer("fb").unwrap();
        b.attach_color(fb, Some(tex)).unwrap();
        b.set_target(Target::Framebuffer(fb));
        b.clear(Color::from_straight(0.0, 1.0, 0.0, 0.5)).unwrap();

        b.set_target(Target::Surface);
        b.clear(Color::BLACK).unwrap();
        let copy = b.create_program(&COPY).unwrap();
        b.use_program(copy);
        b.bind_texture(INPUT_TEXTURE_SLOT, tex);
        b.draw(Primitive::Triangles, 0, 6).unwrap();

        assert_eq!(b.pixel(2, 2), Some(Color::from_premul(0.0, 0.5, 0.0, 1.0)));
        // The input is still there, unchanged, for the next draw.
        assert_eq!(
            b.texture(tex).and_then(|p| p.get(2, 2)),
            Some(Color::from_straight(0.0, 1.0, 0.0, 0.5))
        );
        assert_eq!(b.live_textures(), 1);
    }

    #[test]
    fn line_loop_blends_each_pixel_once() {
        let mut b = flat_setup(Extent::new(20, 20));
        let params = b.state.uniforms[PARAMS_SLOT as usize].unwrap();
        b.buffer_data(params, bytemuck::bytes_of(&Color::from_straight(1.0, 1.0, 1.0, 0.5)))
            .unwrap();
        let pts = [Vec2::new(-0.5, -0.5), Vec2::new(0.5, -0.5), Vec2::new(0.5, 0.5), Vec2::new(-0.5, 0.5)];
        let vb = uniform(&mut b, bytemuck::cast_slice(&pts));
        let va = b.state.vertex_array.unwrap();
        b.vertex_array_buffer(va, vb).unwrap();

        b.clear(Color::TRANSPARENT).unwrap();
        b.draw(Primitive::LineLoop { width: 2.0 }, 0, 4).unwrap();

        // Corner pixel is covered by two segments but blended once.
        assert_eq!(b.pixel(5, 5).map(|c| c.a), Some(0.5));
        assert_eq!(b.pixel(10, 10), Some(Color::TRANSPARENT));
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn program_without_entry_point_fails_to_link() {
        let mut b = SoftwareBackend::new(Extent::new(1, 1));
        let err = b.create_program(&BROKEN).unwrap_err();
        assert!(matches!(err, GpuError::ProgramLink { label: "broken", .. }));
        assert_eq!(b.live_programs(), 0);
    }

    #[test]
    fn fail_after_limits_allocations() {
        let mut b = SoftwareBackend::new(Extent::new(1, 1));
        b.fail_after(2);
        assert!(b.create_buffer("a").is_ok());
        assert!(b.create_framebuffer("b").is_ok());
        assert!(matches!(b.create_buffer("c"), Err(GpuError::OutOfMemory { what: "buffer" })));

        b.clear_failures();
        assert!(b.create_buffer("d").is_ok());
        assert_eq!(b.live_objects(), 3);
    }

    #[test]
    fn draw_to_detached_framebuffer_is_rejected() {
        let mut b = flat_setup(Extent::new(2, 2));
        let fb = b.create_framebuffer("fb").unwrap();
        b.set_target(Target::Framebuffer(fb));
        assert!(matches!(b.draw(Primitive::Triangles, 0, 6), Err(GpuError::NoTarget)));
        assert_eq!(b.target_extent(), Extent::default());
    }

    #[test]
    fn reading_past_the_vertex_buffer_is_a_validation_error() {
        let mut b = flat_setup(Extent::new(2, 2));
        assert!(matches!(b.draw(Primitive::Triangles, 3, 6), Err(GpuError::Validation(_))));
    }

    #[test]
    fn sampling_the_render_target_is_rejected() {
        let mut b = flat_setup(Extent::new(2, 2));
        let tex = b.create_texture("frame", Extent::new(2, 2)).unwrap();
        let fb = b.create_framebuffer("fb").unwrap();
        b.attach_color(fb, Some(tex)).unwrap();
        b.set_target(Target::Framebuffer(fb));
        let copy = b.create_program(&COPY).unwrap();
        b.use_program(copy);
        b.bind_texture(INPUT_TEXTURE_SLOT, tex);
        assert!(matches!(b.draw(Primitive::Triangles, 0, 6), Err(GpuError::Validation(_))));
    }

    #[test]
    fn flat_program_ignores_a_stale_input_binding() {
        let mut b = flat_setup(Extent::new(2, 2));
        let tex = b.create_texture("frame", Extent::new(2, 2)).unwrap();
        let fb = b.create_framebuffer("fb").unwrap();
        b.attach_color(fb, Some(tex)).unwrap();
        b.set_target(Target::Framebuffer(fb));
        // Left over from an earlier blit of the same pooled frame.
        b.bind_texture(INPUT_TEXTURE_SLOT, tex);

        b.draw(Primitive::Triangles, 0, 6).unwrap();
        assert_eq!(b.texture(tex).unwrap().get(0, 0), Some(Color::opaque(1.0, 0.0, 0.0)));
    }

    #[test]
    fn unbinding_the_input_leaves_sampling_programs_without_one() {
        let mut b = flat_setup(Extent::new(2, 2));
        let tex = b.create_texture("frame", Extent::new(2, 2)).unwrap();
        b.bind_texture(INPUT_TEXTURE_SLOT, tex);
        assert_eq!(b.bound_texture(), Some(tex));

        b.unbind_texture(INPUT_TEXTURE_SLOT);
        assert_eq!(b.bound_texture(), None);
        let copy = b.create_program(&COPY).unwrap();
        b.use_program(copy);
        assert!(matches!(b.draw(Primitive::Triangles, 0, 6), Err(GpuError::Validation(_))));
    }

    #[test]
    fn only_sampling_shadings_read_the_input() {
        assert!(!Shading::Uniform.samples());
        assert!(Shading::Sampled.samples());
        assert!(Shading::SampledTinted.samples());
    }

    #[test]
    fn deleting_an_attached_texture_detaches_it() {
        let mut b = SoftwareBackend::new(Extent::new(2, 2));
        let tex = b.create_texture("t", Extent::new(2, 2)).unwrap();
        let fb = b.create_framebuffer("fb").unwrap();
        b.attach_color(fb, Some(tex)).unwrap();
        b.delete_texture(tex);
        b.set_target(Target::Framebuffer(fb));
        assert!(matches!(b.clear(Color::WHITE), Err(GpuError::NoTarget)));
    }
}
