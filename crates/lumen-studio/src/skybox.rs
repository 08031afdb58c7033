use glam::Vec4;
use lumen_engine::gfx::{
    DeviceError, GraphicsDevice, MeshDesc, MeshId, TextureDesc, TextureId, TextureKind,
    TextureSource,
};
use lumen_engine::render::SkyVertex;
use lumen_engine::scene::Skybox;

use crate::geometry::{gradient_cubemap, sky_cube};

const FACE_SIZE: u32 = 64;

/// Procedural sky: blue zenith, pale horizon, dark ground.
#[derive(Debug)]
pub struct GradientSkybox {
    mesh: MeshId,
    vertex_count: u32,
    cube: TextureId,
}

impl GradientSkybox {
    pub fn new(device: &mut dyn GraphicsDevice) -> Result<Self, DeviceError> {
        let vertices = sky_cube();
        let mesh = device.create_mesh(&MeshDesc {
            label: "sky cube",
            vertices: bytemuck::cast_slice(&vertices),
            layout: SkyVertex::LAYOUT,
        })?;

        let pixels = gradient_cubemap(
            FACE_SIZE,
            Vec4::new(0.18, 0.36, 0.78, 1.0),
            Vec4::new(0.85, 0.88, 0.92, 1.0),
            Vec4::new(0.16, 0.15, 0.14, 1.0),
        );
        let cube = match device.create_texture(&TextureDesc {
            label: "sky gradient",
            kind: TextureKind::Cube,
            width: FACE_SIZE,
            height: FACE_SIZE,
            pixels: &pixels,
        }) {
            Ok(cube) => cube,
            Err(e) => {
                device.destroy_mesh(mesh);
                return Err(e);
            }
        };

        Ok(Self {
            mesh,
            vertex_count: vertices.len() as u32,
            cube,
        })
    }

    pub fn release(self, device: &mut dyn GraphicsDevice) {
        device.destroy_mesh(self.mesh);
        device.destroy_texture(self.cube);
    }
}

impl Skybox for GradientSkybox {
    fn draw(&self, device: &mut dyn GraphicsDevice) {
        device.bind_texture(0, TextureSource::Texture(self.cube));
        device.draw(self.mesh, 0..self.vertex_count);
    }
}
