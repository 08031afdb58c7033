//! Graphics device contract and its implementations.
//!
//! The frame pipeline talks to the GPU exclusively through [`GraphicsDevice`]:
//! - [`WgpuDevice`] drives a window surface through wgpu
//! - [`SoftDevice`] is a headless CPU reference used by tests and tooling

mod color;
mod device;
mod error;
mod mesh;
mod soft;
mod types;
mod uniform;
mod wgpu_device;

pub use color::Color;
pub use device::{Display, GraphicsDevice, ProgramDesc};
pub use error::DeviceError;
pub use mesh::{MeshDesc, VertexAttribute, VertexLayout};
pub use soft::{DeviceEvent, SoftDevice};
pub use types::{
    DepthFunc, MeshId, ProgramId, Region, RenderTarget, Resolution, ResourceCounts, TargetDesc,
    TargetId, TextureDesc, TextureId, TextureKind, TextureSource,
};
pub use uniform::{UniformLayout, UniformLayoutBuilder, UniformSlot, UniformType, UniformValue};
pub use wgpu_device::WgpuDevice;
