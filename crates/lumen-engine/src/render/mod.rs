//! The frame pipeline.
//!
//! Each frame the scene is drawn into a multisampled offscreen target,
//! resolved into a single-sampled one, and presented through a post-process
//! pass over a full-screen quad:
//!
//! ```text
//! BindOffscreen -> BuildQueue -> DrawScene -> Resolve
//!   -> BindScreen -> PostProcess -> Present -> ReleaseFrame
//! ```
//!
//! Everything goes through [`GraphicsDevice`](crate::gfx::GraphicsDevice), so
//! the same pipeline runs on the wgpu device and on the headless
//! [`SoftDevice`](crate::gfx::SoftDevice).

mod config;
mod error;
mod lighting;
mod pipeline;
mod quad;
mod queue;
mod shaders;
mod stage;
mod target;
mod vertex;

#[cfg(test)]
mod tests;

pub use config::PipelineConfig;
pub use error::RenderError;
pub use lighting::{
    DirectionalLight, LightingConfig, POINT_LIGHT_COUNT, POINT_LIGHT_UNIFORMS, PointLight,
    point_light_uniform,
};
pub use pipeline::{FrameReport, RenderPipeline, skybox_view_projection};
pub use quad::{QUAD_VERTICES, QuadVertex, ScreenQuad};
pub use queue::{RenderQueue, build_render_queue};
pub use shaders::{ProgramKind, ProgramSource, ShaderProgram, ShaderSet, ShaderSources};
pub use stage::{FrameStage, StageTracker};
pub use target::{FrameTarget, FrameTargets};
pub use vertex::{MeshVertex, SkyVertex};
