//! Headless GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue without a window
//! - handing the device to [`WgpuBackend`](crate::backend::WgpuBackend)

mod gpu;
mod init;

pub use gpu::Gpu;
pub use init::GpuInit;
