use bytemuck::{Pod, Zeroable};

use crate::gfx::{DeviceError, GraphicsDevice, MeshDesc, MeshId, VertexAttribute, VertexLayout};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    /// NDC.
    pub position: [f32; 2],
    /// Texture coordinate, v up.
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRIBUTES: [VertexAttribute; 2] =
        [VertexAttribute::new(0, 2), VertexAttribute::new(1, 2)];

    pub const LAYOUT: VertexLayout = VertexLayout::new(&Self::ATTRIBUTES);
}

/// Two triangles covering the viewport.
#[rustfmt::skip]
pub const QUAD_VERTICES: [QuadVertex; 6] = [
    QuadVertex { position: [-1.0,  1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 0.0] },
    QuadVertex { position: [ 1.0, -1.0], uv: [1.0, 0.0] },

    QuadVertex { position: [-1.0,  1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [ 1.0, -1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [ 1.0,  1.0], uv: [1.0, 1.0] },
];

/// Static full-screen mesh used to present the resolved scene.
#[derive(Debug)]
pub struct ScreenQuad {
    mesh: MeshId,
}

impl ScreenQuad {
    pub const VERTEX_COUNT: u32 = QUAD_VERTICES.len() as u32;

    pub fn new(device: &mut dyn GraphicsDevice) -> Result<Self, DeviceError> {
        let mesh = device.create_mesh(&MeshDesc {
            label: "screen quad",
            vertices: bytemuck::cast_slice(&QUAD_VERTICES),
            layout: QuadVertex::LAYOUT,
        })?;
        Ok(Self { mesh })
    }

    #[inline]
    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    /// Draws both triangles with whatever program is active.
    pub fn draw(&self, device: &mut dyn GraphicsDevice) {
        device.draw(self.mesh, 0..Self::VERTEX_COUNT);
    }

    pub fn release(self, device: &mut dyn GraphicsDevice) {
        device.destroy_mesh(self.mesh);
    }
}
