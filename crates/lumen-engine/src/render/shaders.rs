//! The pipeline's three shader programs.

use std::borrow::Cow;
use std::fmt;
use std::ops::Index;

use glam::{Mat4, Vec3};

use crate::gfx::{
    GraphicsDevice, ProgramDesc, ProgramId, TextureKind, UniformLayout, UniformType, UniformValue,
};

use super::RenderError;
use super::lighting::declare_lights;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ProgramKind {
    /// Lit scene geometry.
    Main,
    /// Post-process over the resolved scene.
    Screen,
    Skybox,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 3] = [ProgramKind::Main, ProgramKind::Screen, ProgramKind::Skybox];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn label(self) -> &'static str {
        match self {
            ProgramKind::Main => "main",
            ProgramKind::Screen => "screen",
            ProgramKind::Skybox => "skybox",
        }
    }

    /// Kind of texture the program samples from unit 0.
    pub const fn texture(self) -> Option<TextureKind> {
        match self {
            ProgramKind::Main | ProgramKind::Screen => Some(TextureKind::D2),
            ProgramKind::Skybox => Some(TextureKind::Cube),
        }
    }

    /// Uniform block the program's WGSL declares.
    pub fn uniform_layout(self) -> UniformLayout {
        match self {
            ProgramKind::Main => declare_lights(
                UniformLayout::builder()
                    .field("MVP", UniformType::Mat4)
                    .field("M", UniformType::Mat4)
                    .field("cameraPos_wS", UniformType::Vec3),
            )
            .build(),
            ProgramKind::Screen => UniformLayout::builder()
                .field("offset", UniformType::Int)
                .build(),
            ProgramKind::Skybox => UniformLayout::builder()
                .field("VP", UniformType::Mat4)
                .field("skybox", UniformType::Int)
                .build(),
        }
    }
}

impl fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Handle to one loaded program with typed uniform setters.
///
/// Setters apply to whichever program is active on the device; call
/// [`activate`](Self::activate) first.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ShaderProgram {
    kind: ProgramKind,
    id: ProgramId,
}

impl ShaderProgram {
    #[inline]
    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    #[inline]
    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn activate(&self, device: &mut dyn GraphicsDevice) {
        device.use_program(self.id);
    }

    pub fn set_int(&self, device: &mut dyn GraphicsDevice, name: &str, value: i32) {
        self.set(device, name, UniformValue::Int(value));
    }

    pub fn set_float(&self, device: &mut dyn GraphicsDevice, name: &str, value: f32) {
        self.set(device, name, UniformValue::Float(value));
    }

    pub fn set_vec3(&self, device: &mut dyn GraphicsDevice, name: &str, value: Vec3) {
        self.set(device, name, UniformValue::Vec3(value));
    }

    pub fn set_mat4(&self, device: &mut dyn GraphicsDevice, name: &str, value: Mat4) {
        self.set(device, name, UniformValue::Mat4(value));
    }

    /// Writes through to the device only while this program is the active one.
    fn set(&self, device: &mut dyn GraphicsDevice, name: &str, value: UniformValue) {
        if device.active_program() != Some(self.id) {
            log::warn!("uniform '{name}' set on the {} program while it is not active", self.kind);
            return;
        }
        device.set_uniform(name, value);
    }
}

/// Vertex + fragment source of one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl ProgramSource {
    pub const fn from_static(vertex: &'static str, fragment: &'static str) -> Self {
        Self {
            vertex: Cow::Borrowed(vertex),
            fragment: Cow::Borrowed(fragment),
        }
    }
}

/// Sources for all three programs. Defaults to the built-in WGSL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub main: ProgramSource,
    pub screen: ProgramSource,
    pub skybox: ProgramSource,
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self {
            main: ProgramSource::from_static(
                include_str!("shaders/basic.vert.wgsl"),
                include_str!("shaders/basic.frag.wgsl"),
            ),
            screen: ProgramSource::from_static(
                include_str!("shaders/screen.vert.wgsl"),
                include_str!("shaders/screen.frag.wgsl"),
            ),
            skybox: ProgramSource::from_static(
                include_str!("shaders/skybox.vert.wgsl"),
                include_str!("shaders/skybox.frag.wgsl"),
            ),
        }
    }
}

impl ShaderSources {
    pub fn get(&self, kind: ProgramKind) -> &ProgramSource {
        match kind {
            ProgramKind::Main => &self.main,
            ProgramKind::Screen => &self.screen,
            ProgramKind::Skybox => &self.skybox,
        }
    }
}

/// The three programs, indexed by [`ProgramKind`] and released together.
#[derive(Debug)]
pub struct ShaderSet {
    programs: [ShaderProgram; 3],
    released: bool,
}

impl ShaderSet {
    /// Compiles all programs in [`ProgramKind::ALL`] order. On failure the
    /// programs compiled so far are destroyed before the error is returned.
    ///
    /// After loading, the skybox program is left active with its `skybox`
    /// sampler uniform pointing at unit 0.
    pub fn load(
        device: &mut dyn GraphicsDevice,
        sources: &ShaderSources,
    ) -> Result<Self, RenderError> {
        let mut programs = ProgramKind::ALL.map(|kind| ShaderProgram {
            kind,
            id: ProgramId::default(),
        });

        for (i, kind) in ProgramKind::ALL.into_iter().enumerate() {
            let source = sources.get(kind);
            let layout = kind.uniform_layout();
            let desc = ProgramDesc {
                label: kind.label(),
                vertex: &source.vertex,
                fragment: &source.fragment,
                uniforms: &layout,
                texture: kind.texture(),
            };
            match device.create_program(&desc) {
                Ok(id) => programs[i].id = id,
                Err(source) => {
                    log::error!("{kind} program failed: {source}");
                    for loaded in &programs[..i] {
                        device.destroy_program(loaded.id);
                    }
                    return Err(RenderError::ShaderLoad { kind, source });
                }
            }
        }

        let set = Self {
            programs,
            released: false,
        };
        let skybox = set[ProgramKind::Skybox];
        skybox.activate(device);
        skybox.set_int(device, "skybox", 0);

        log::debug!("shader set loaded");
        Ok(set)
    }

    /// Destroys every program.
    pub fn release(mut self, device: &mut dyn GraphicsDevice) {
        for program in &self.programs {
            device.destroy_program(program.id);
        }
        self.released = true;
    }
}

impl Index<ProgramKind> for ShaderSet {
    type Output = ShaderProgram;

    fn index(&self, kind: ProgramKind) -> &ShaderProgram {
        &self.programs[kind.index()]
    }
}

impl Drop for ShaderSet {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("ShaderSet dropped without release; GPU programs leaked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{Resolution, SoftDevice};

    #[test]
    fn main_layout_matches_wgsl_struct() {
        let layout = ProgramKind::Main.uniform_layout();
        assert_eq!(layout.get("MVP").unwrap().offset, 0);
        assert_eq!(layout.get("M").unwrap().offset, 64);
        assert_eq!(layout.get("cameraPos_wS").unwrap().offset, 128);
        assert_eq!(layout.get("dirLight.direction").unwrap().offset, 144);
        assert_eq!(layout.get("pointLights[0].position").unwrap().offset, 208);
        assert_eq!(layout.get("pointLights[3].quadratic").unwrap().offset, 208 + 240 + 68);
        assert_eq!(layout.size(), 528);
    }

    #[test]
    fn load_points_skybox_sampler_at_unit_zero() {
        let mut dev = SoftDevice::new(Resolution::new(4, 4));
        let set = ShaderSet::load(&mut dev, &ShaderSources::default()).unwrap();
        let skybox = set[ProgramKind::Skybox];

        assert_eq!(dev.active_program(), Some(skybox.id()));
        assert_eq!(dev.uniform(skybox.id(), "skybox"), Some(UniformValue::Int(0)));
        assert_eq!(dev.live_resources().programs, 3);

        set.release(&mut dev);
        assert_eq!(dev.live_resources().programs, 0);
    }

    #[test]
    fn failed_program_releases_earlier_ones() {
        let mut dev = SoftDevice::new(Resolution::new(4, 4));
        dev.reject_program("skybox");

        let err = ShaderSet::load(&mut dev, &ShaderSources::default()).unwrap_err();
        assert!(matches!(err, RenderError::ShaderLoad { kind: ProgramKind::Skybox, .. }));
        assert_eq!(dev.live_resources().programs, 0);
    }

    #[test]
    fn setters_skip_inactive_programs() {
        let mut dev = SoftDevice::new(Resolution::new(4, 4));
        let set = ShaderSet::load(&mut dev, &ShaderSources::default()).unwrap();
        let (main, screen) = (set[ProgramKind::Main], set[ProgramKind::Screen]);

        main.activate(&mut dev);
        screen.set_int(&mut dev, "offset", 9);
        assert_eq!(dev.uniform(screen.id(), "offset"), None);

        screen.activate(&mut dev);
        screen.set_int(&mut dev, "offset", 9);
        assert_eq!(dev.uniform(screen.id(), "offset"), Some(UniformValue::Int(9)));
        set.release(&mut dev);
    }

    #[test]
    fn programs_indexed_by_kind() {
        let mut dev = SoftDevice::new(Resolution::new(4, 4));
        let set = ShaderSet::load(&mut dev, &ShaderSources::default()).unwrap();
        for kind in ProgramKind::ALL {
            assert_eq!(set[kind].kind(), kind);
            assert_eq!(dev.program_label(set[kind].id()), Some(kind.label()));
        }
        set.release(&mut dev);
    }
}
