/// One interleaved `f32` vertex attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexAttribute {
    /// Shader input location.
    pub location: u32,
    /// Number of `f32` components (1..=4).
    pub components: u32,
}

impl VertexAttribute {
    #[inline]
    pub const fn new(location: u32, components: u32) -> Self {
        Self { location, components }
    }
}

/// Interleaved vertex layout. Attributes are packed in declaration order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexLayout {
    pub attributes: &'static [VertexAttribute],
}

impl VertexLayout {
    #[inline]
    pub const fn new(attributes: &'static [VertexAttribute]) -> Self {
        Self { attributes }
    }

    /// Floats per vertex.
    pub fn floats_per_vertex(&self) -> usize {
        self.attributes.iter().map(|a| a.components as usize).sum()
    }

    /// Bytes per vertex.
    #[inline]
    pub fn stride(&self) -> u64 {
        (self.floats_per_vertex() * std::mem::size_of::<f32>()) as u64
    }

    /// Offset in floats of the attribute at `index`.
    pub fn float_offset(&self, index: usize) -> usize {
        self.attributes[..index]
            .iter()
            .map(|a| a.components as usize)
            .sum()
    }
}

/// Mesh upload parameters.
#[derive(Debug, Clone)]
pub struct MeshDesc<'a> {
    pub label: &'a str,
    pub vertices: &'a [f32],
    pub layout: VertexLayout,
}

impl MeshDesc<'_> {
    /// Number of whole vertices in `vertices`.
    pub fn vertex_count(&self) -> u32 {
        let per = self.layout.floats_per_vertex();
        if per == 0 { 0 } else { (self.vertices.len() / per) as u32 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POS_UV: [VertexAttribute; 2] = [VertexAttribute::new(0, 2), VertexAttribute::new(1, 2)];

    #[test]
    fn stride_and_offsets() {
        let layout = VertexLayout::new(&POS_UV);
        assert_eq!(layout.floats_per_vertex(), 4);
        assert_eq!(layout.stride(), 16);
        assert_eq!(layout.float_offset(1), 2);
    }

    #[test]
    fn vertex_count_ignores_partial_tail() {
        let data = [0.0f32; 9];
        let desc = MeshDesc { label: "m", vertices: &data, layout: VertexLayout::new(&POS_UV) };
        assert_eq!(desc.vertex_count(), 2);
    }
}
