//! GPU device and surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating and configuring the Surface (swapchain) of one window
//! - acquiring surface textures and handing out a [`WgpuBackend`] over the
//!   same device
//!
//! [`WgpuBackend`]: crate::gpu::WgpuBackend

mod frame;
mod gpu;
mod init;
mod surface;

pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
pub use surface::SurfaceErrorAction;
