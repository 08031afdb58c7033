//! wgpu instance, device and window surface.
//!
//! [`Gpu`] owns the core wgpu objects and the surface configuration. It hands
//! out surface frames on demand; command recording lives in
//! [`WgpuDevice`](crate::gfx::WgpuDevice).

mod context;
mod error;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::SurfaceFrame;
pub use init::GpuInit;
