//! Frame-invariant lights pushed to the Main program before the scene pass.

use glam::Vec3;

use crate::gfx::{GraphicsDevice, UniformLayoutBuilder, UniformType};

use super::ShaderProgram;

/// Number of point lights the Main program declares.
pub const POINT_LIGHT_COUNT: usize = 4;

const DIR_LIGHT_FIELDS: [(&str, UniformType); 4] = [
    ("direction", UniformType::Vec3),
    ("ambient", UniformType::Vec3),
    ("diffuse", UniformType::Vec3),
    ("specular", UniformType::Vec3),
];

const POINT_LIGHT_FIELDS: [(&str, UniformType); 7] = [
    ("position", UniformType::Vec3),
    ("ambient", UniformType::Vec3),
    ("diffuse", UniformType::Vec3),
    ("specular", UniformType::Vec3),
    ("constant", UniformType::Float),
    ("linear", UniformType::Float),
    ("quadratic", UniformType::Float),
];

/// Uniforms pushed per point light.
pub const POINT_LIGHT_UNIFORMS: usize = POINT_LIGHT_FIELDS.len();

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(1.0, -1.0, 0.0),
            ambient: Vec3::splat(0.05),
            diffuse: Vec3::splat(0.4),
            specular: Vec3::splat(0.4),
        }
    }
}

/// Point light with constant/linear/quadratic distance attenuation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl PointLight {
    /// Light at `position` with the default colors and attenuation.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::new(1.0, 0.6, 0.6),
            specular: Vec3::splat(0.6),
            constant: 1.0,
            linear: 0.0014,
            quadratic: 0.000007,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightingConfig {
    pub directional: DirectionalLight,
    pub point_lights: [PointLight; POINT_LIGHT_COUNT],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            directional: DirectionalLight::default(),
            point_lights: [
                PointLight::at(Vec3::new(400.0, 100.0, 0.0)),
                PointLight::at(Vec3::new(-400.0, 100.0, 0.0)),
                PointLight::at(Vec3::new(400.0, 400.0, 200.0)),
                PointLight::at(Vec3::new(-400.0, 300.0, -200.0)),
            ],
        }
    }
}

impl LightingConfig {
    /// Pushes every light uniform to `program`, which must be active.
    pub fn apply(&self, device: &mut dyn GraphicsDevice, program: &ShaderProgram) {
        let d = &self.directional;
        program.set_vec3(device, "dirLight.direction", d.direction);
        program.set_vec3(device, "dirLight.ambient", d.ambient);
        program.set_vec3(device, "dirLight.diffuse", d.diffuse);
        program.set_vec3(device, "dirLight.specular", d.specular);

        for (i, light) in self.point_lights.iter().enumerate() {
            program.set_vec3(device, &point_light_uniform(i, "position"), light.position);
            program.set_vec3(device, &point_light_uniform(i, "ambient"), light.ambient);
            program.set_vec3(device, &point_light_uniform(i, "diffuse"), light.diffuse);
            program.set_vec3(device, &point_light_uniform(i, "specular"), light.specular);
            program.set_float(device, &point_light_uniform(i, "constant"), light.constant);
            program.set_float(device, &point_light_uniform(i, "linear"), light.linear);
            program.set_float(device, &point_light_uniform(i, "quadratic"), light.quadratic);
        }
    }
}

/// `pointLights[i].field`
pub fn point_light_uniform(index: usize, field: &str) -> String {
    format!("pointLights[{index}].{field}")
}

/// Declares `dirLight` and the `pointLights` array on a uniform layout.
pub(crate) fn declare_lights(builder: UniformLayoutBuilder) -> UniformLayoutBuilder {
    let builder = builder.group("dirLight", &DIR_LIGHT_FIELDS);
    (0..POINT_LIGHT_COUNT).fold(builder, |b, i| {
        b.group(&format!("pointLights[{i}]"), &POINT_LIGHT_FIELDS)
    })
}
