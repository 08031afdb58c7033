//! Vertex formats expected by the built-in Main and Skybox programs.

use bytemuck::{Pod, Zeroable};

use crate::gfx::{VertexAttribute, VertexLayout};

/// Lit mesh vertex (Main program).
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Texture coordinate, v up.
    pub uv: [f32; 2],
}

impl MeshVertex {
    const ATTRIBUTES: [VertexAttribute; 3] = [
        VertexAttribute::new(0, 3),
        VertexAttribute::new(1, 3),
        VertexAttribute::new(2, 2),
    ];

    pub const LAYOUT: VertexLayout = VertexLayout::new(&Self::ATTRIBUTES);

    #[inline]
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, normal, uv }
    }
}

/// Skybox cube vertex; the position doubles as the cube-map direction.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct SkyVertex {
    pub position: [f32; 3],
}

impl SkyVertex {
    const ATTRIBUTES: [VertexAttribute; 1] = [VertexAttribute::new(0, 3)];

    pub const LAYOUT: VertexLayout = VertexLayout::new(&Self::ATTRIBUTES);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_match_struct_sizes() {
        assert_eq!(MeshVertex::LAYOUT.stride(), std::mem::size_of::<MeshVertex>() as u64);
        assert_eq!(SkyVertex::LAYOUT.stride(), std::mem::size_of::<SkyVertex>() as u64);
        assert_eq!(MeshVertex::LAYOUT.float_offset(2), 6);
    }
}
