use std::ops::Range;

use super::{
    Color, DepthFunc, DeviceError, MeshDesc, MeshId, ProgramId, Region, RenderTarget,
    Resolution, ResourceCounts, TargetDesc, TargetId, TextureDesc, TextureId, TextureKind,
    TextureSource, UniformLayout, UniformValue,
};

/// Display surface provider.
///
/// Exposes the drawable resolution (read when frame targets are allocated) and
/// presents the default framebuffer.
pub trait Display {
    fn resolution(&self) -> Resolution;

    /// Presents everything drawn to [`RenderTarget::Screen`] since the last swap.
    ///
    /// May block for vertical sync.
    fn swap_buffers(&mut self);
}

/// Program compilation parameters.
///
/// `vertex` and `fragment` are stage sources in the device's shading language.
/// `uniforms` declares the named uniforms the program accepts; `texture`
/// declares the kind of texture sampled from unit 0, if any.
#[derive(Debug, Clone)]
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
    pub uniforms: &'a UniformLayout,
    pub texture: Option<TextureKind>,
}

/// Immediate-mode graphics device contract.
///
/// State (bound target, active program, depth state, bound textures) persists
/// across calls until changed. Resource creation is the only fallible part;
/// draw-time misuse (unknown handle, uniform without an active program) is
/// logged and ignored.
pub trait GraphicsDevice: Display {
    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId, DeviceError>;
    fn destroy_target(&mut self, id: TargetId);

    /// Makes `target` the destination of subsequent clears and draws.
    fn bind_target(&mut self, target: RenderTarget);

    /// Clears the bound target's color and, if requested and present, depth (to 1.0).
    fn clear(&mut self, color: Color, clear_depth: bool);

    fn set_depth_test(&mut self, enabled: bool);
    fn set_depth_func(&mut self, func: DepthFunc);

    /// Copies `region` of `src`'s color into the same region of `dst`,
    /// resolving samples when `src` is multisampled. No scaling, nearest filter.
    fn blit(&mut self, src: TargetId, dst: TargetId, region: Region);

    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, DeviceError>;
    fn destroy_program(&mut self, id: ProgramId);

    /// Activates a program; uniform setters apply to the active program.
    fn use_program(&mut self, id: ProgramId);

    fn active_program(&self) -> Option<ProgramId>;

    /// Sets a named uniform on the active program.
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    fn create_mesh(&mut self, desc: &MeshDesc<'_>) -> Result<MeshId, DeviceError>;
    fn destroy_mesh(&mut self, id: MeshId);

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId, DeviceError>;
    fn destroy_texture(&mut self, id: TextureId);

    fn bind_texture(&mut self, unit: u32, source: TextureSource);

    /// Draws `vertices` of `mesh` as a triangle list with the active program.
    fn draw(&mut self, mesh: MeshId, vertices: Range<u32>);

    /// Number of live resources of each kind.
    fn live_resources(&self) -> ResourceCounts;
}
