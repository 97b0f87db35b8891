/// How the window's device and surface are set up.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Instance backends to try.
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,

    /// Pick an sRGB surface format when one is offered. Off by default:
    /// colors are written to the surface as authored, without encoding.
    pub prefer_srgb: bool,

    /// FIFO is supported everywhere and paces the render thread to vsync.
    pub present_mode: wgpu::PresentMode,

    /// Used if the surface supports it; otherwise the first supported mode.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,

    /// Hint; support depends on platform and backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

impl GpuInit {
    /// Low-power adapter, no vsync wait beyond what the platform forces.
    pub fn low_power() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::LowPower,
            present_mode: wgpu::PresentMode::AutoNoVsync,
            ..Self::default()
        }
    }
}
