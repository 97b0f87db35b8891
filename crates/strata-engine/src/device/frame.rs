/// One acquired surface texture plus a view of it.
///
/// Hold it only for the duration of a frame: an outstanding surface texture
/// blocks acquisition of the next one. [`present`](Self::present) hands it
/// back to the swapchain.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl GpuFrame {
    pub fn present(self) {
        drop(self.view);
        self.surface_texture.present();
    }
}
