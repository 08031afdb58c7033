use glam::{Mat4, Quat, Vec3};
use lumen_engine::gfx::{
    DeviceError, GraphicsDevice, MeshDesc, MeshId, TextureDesc, TextureId, TextureKind,
    TextureSource,
};
use lumen_engine::render::{MeshVertex, ShaderProgram};
use lumen_engine::scene::Drawable;

use crate::geometry::{checker_pixels, cube_vertices};

const CHECKER_SIZE: u32 = 64;

/// GPU resources shared by every model in the scene.
#[derive(Debug)]
pub struct ModelAssets {
    pub cube: MeshId,
    pub cube_vertices: u32,
    pub materials: Vec<TextureId>,
}

impl ModelAssets {
    /// Uploads the cube mesh and one checker texture per color pair.
    pub fn new(
        device: &mut dyn GraphicsDevice,
        palettes: &[([u8; 4], [u8; 4])],
    ) -> Result<Self, DeviceError> {
        let vertices = cube_vertices();
        let cube = device.create_mesh(&MeshDesc {
            label: "cube",
            vertices: bytemuck::cast_slice(&vertices),
            layout: MeshVertex::LAYOUT,
        })?;

        let mut assets = Self {
            cube,
            cube_vertices: vertices.len() as u32,
            materials: Vec::with_capacity(palettes.len()),
        };
        for &(a, b) in palettes {
            let pixels = checker_pixels(CHECKER_SIZE, 8, a, b);
            let texture = device.create_texture(&TextureDesc {
                label: "checker",
                kind: TextureKind::D2,
                width: CHECKER_SIZE,
                height: CHECKER_SIZE,
                pixels: &pixels,
            });
            match texture {
                Ok(id) => assets.materials.push(id),
                Err(e) => {
                    assets.release(device);
                    return Err(e);
                }
            }
        }
        Ok(assets)
    }

    pub fn release(self, device: &mut dyn GraphicsDevice) {
        device.destroy_mesh(self.cube);
        for texture in self.materials {
            device.destroy_texture(texture);
        }
    }
}

/// A textured cube spinning in place.
#[derive(Debug, Clone)]
pub struct Model {
    mesh: MeshId,
    vertex_count: u32,
    texture: TextureId,
    position: Vec3,
    scale: f32,
    spin_axis: Vec3,
    /// Radians per second.
    spin_rate: f32,
    angle: f32,
}

impl Model {
    pub fn cube(assets: &ModelAssets, texture: TextureId, position: Vec3, scale: f32) -> Self {
        Self {
            mesh: assets.cube,
            vertex_count: assets.cube_vertices,
            texture,
            position,
            scale,
            spin_axis: Vec3::Y,
            spin_rate: 0.0,
            angle: 0.0,
        }
    }

    pub fn spinning(mut self, axis: Vec3, rate: f32) -> Self {
        self.spin_axis = axis.try_normalize().unwrap_or(Vec3::Y);
        self.spin_rate = rate;
        self
    }

    /// Orientation at `seconds` since start.
    pub fn set_time(&mut self, seconds: f32) {
        self.angle = (seconds * self.spin_rate) % std::f32::consts::TAU;
    }
}

impl Drawable for Model {
    fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_axis_angle(self.spin_axis, self.angle),
            self.position,
        )
    }

    fn draw(&self, device: &mut dyn GraphicsDevice, _program: &ShaderProgram) {
        device.bind_texture(0, TextureSource::Texture(self.texture));
        device.draw(self.mesh, 0..self.vertex_count);
    }
}

#[cfg(test)]
mod tests {
    use lumen_engine::gfx::{Resolution, SoftDevice};

    use super::*;

    #[test]
    fn model_matrix_places_and_scales() {
        let mut dev = SoftDevice::new(Resolution::new(4, 4));
        let assets = ModelAssets::new(&mut dev, &[([255; 4], [0, 0, 0, 255])]).unwrap();
        let model = Model::cube(&assets, assets.materials[0], Vec3::new(1.0, 2.0, 3.0), 0.5);

        let corner = model.model_matrix().transform_point3(Vec3::ONE);
        assert_eq!(corner, Vec3::new(1.5, 2.5, 3.5));

        assets.release(&mut dev);
        assert_eq!(dev.live_resources().total(), 0);
    }

    #[test]
    fn spin_wraps_the_angle() {
        let mut dev = SoftDevice::new(Resolution::new(4, 4));
        let assets = ModelAssets::new(&mut dev, &[([255; 4], [0; 4])]).unwrap();
        let mut model =
            Model::cube(&assets, assets.materials[0], Vec3::ZERO, 1.0).spinning(Vec3::Y, 1.0);
        model.set_time(100.0);
        assert!(model.angle < std::f32::consts::TAU);
        assets.release(&mut dev);
    }
}
