//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the window Surface (swapchain)
//! - handing layers an owned [`GpuHandle`] for their own resources

mod context;
mod error;
mod frame;
mod handle;
mod init;
mod surface;

pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use handle::GpuHandle;
pub use init::GpuInit;
