//! Named uniform values and flat uniform-block layouts.
//!
//! Programs declare their uniforms as a flat list of names. Offsets follow the
//! WGSL uniform address space rules so the flat table lines up with the
//! corresponding WGSL struct:
//! - `i32`/`f32` align to 4
//! - `vec3`/`vec4`/`mat4x4` align to 16 (a `vec3` occupies 12 bytes, so a
//!   trailing scalar packs into its fourth lane)
//! - a named group (a nested WGSL struct or array element) starts and ends on
//!   a 16-byte boundary

use std::collections::HashMap;

use glam::{Mat4, Vec3, Vec4};

/// Scalar/vector/matrix type of a uniform field.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformType {
    Int,
    Float,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformType {
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            UniformType::Int | UniformType::Float => 4,
            UniformType::Vec3 => 12,
            UniformType::Vec4 => 16,
            UniformType::Mat4 => 64,
        }
    }

    #[inline]
    pub const fn align(self) -> usize {
        match self {
            UniformType::Int | UniformType::Float => 4,
            UniformType::Vec3 | UniformType::Vec4 | UniformType::Mat4 => 16,
        }
    }
}

/// A value passed to [`GraphicsDevice::set_uniform`].
///
/// [`GraphicsDevice::set_uniform`]: super::GraphicsDevice::set_uniform
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    #[inline]
    pub const fn ty(&self) -> UniformType {
        match self {
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Writes the value's little-endian bytes into `dst` (which must be `ty().size()` long).
    pub fn write_bytes(&self, dst: &mut [u8]) {
        match self {
            UniformValue::Int(v) => dst.copy_from_slice(&v.to_le_bytes()),
            UniformValue::Float(v) => dst.copy_from_slice(&v.to_le_bytes()),
            UniformValue::Vec3(v) => dst.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Vec4(v) => dst.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Mat4(m) => {
                dst.copy_from_slice(bytemuck::cast_slice(&m.to_cols_array()))
            }
        }
    }
}

/// Location of a single uniform inside its block.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformSlot {
    pub offset: usize,
    pub ty: UniformType,
}

/// Name → slot table of a program's uniform block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformLayout {
    slots: HashMap<String, UniformSlot>,
    order: Vec<String>,
    size: usize,
}

impl UniformLayout {
    pub fn builder() -> UniformLayoutBuilder {
        UniformLayoutBuilder::default()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<UniformSlot> {
        self.slots.get(name).copied()
    }

    /// Block size in bytes, padded to 16. Never zero.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// Incremental builder computing WGSL-compatible offsets.
#[derive(Debug, Default)]
pub struct UniformLayoutBuilder {
    layout: UniformLayout,
    cursor: usize,
}

impl UniformLayoutBuilder {
    pub fn field(mut self, name: impl Into<String>, ty: UniformType) -> Self {
        self.push(name.into(), ty);
        self
    }

    /// Declares a nested struct named `prefix` whose fields are addressed as
    /// `prefix.field`.
    pub fn group(mut self, prefix: &str, fields: &[(&str, UniformType)]) -> Self {
        self.cursor = align_to(self.cursor, 16);
        for (field, ty) in fields {
            self.push(format!("{prefix}.{field}"), *ty);
        }
        self.cursor = align_to(self.cursor, 16);
        self
    }

    pub fn build(mut self) -> UniformLayout {
        self.layout.size = align_to(self.cursor, 16).max(16);
        self.layout
    }

    fn push(&mut self, name: String, ty: UniformType) {
        let offset = align_to(self.cursor, ty.align());
        self.cursor = offset + ty.size();
        if self
            .layout
            .slots
            .insert(name.clone(), UniformSlot { offset, ty })
            .is_some()
        {
            log::warn!("uniform '{name}' declared twice; later declaration wins");
            self.layout.order.retain(|n| n != &name);
        }
        self.layout.order.push(name);
    }
}

#[inline]
pub(crate) const fn align_to(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINT_LIGHT: [(&str, UniformType); 7] = [
        ("position", UniformType::Vec3),
        ("ambient", UniformType::Vec3),
        ("diffuse", UniformType::Vec3),
        ("specular", UniformType::Vec3),
        ("constant", UniformType::Float),
        ("linear", UniformType::Float),
        ("quadratic", UniformType::Float),
    ];

    #[test]
    fn scalar_packs_into_vec3_tail() {
        let layout = UniformLayout::builder()
            .field("a", UniformType::Vec3)
            .field("b", UniformType::Float)
            .build();
        assert_eq!(layout.get("a").unwrap().offset, 0);
        assert_eq!(layout.get("b").unwrap().offset, 12);
        assert_eq!(layout.size(), 16);
    }

    #[test]
    fn groups_match_wgsl_struct_array_stride() {
        let layout = UniformLayout::builder()
            .field("M", UniformType::Mat4)
            .group("pointLights[0]", &POINT_LIGHT)
            .group("pointLights[1]", &POINT_LIGHT)
            .build();

        // struct PointLight { 4 x vec3, 3 x f32 } has size 80 in WGSL.
        assert_eq!(layout.get("pointLights[0].position").unwrap().offset, 64);
        assert_eq!(layout.get("pointLights[0].constant").unwrap().offset, 64 + 60);
        assert_eq!(layout.get("pointLights[0].quadratic").unwrap().offset, 64 + 68);
        assert_eq!(layout.get("pointLights[1].position").unwrap().offset, 64 + 80);
        assert_eq!(layout.size(), 64 + 160);
    }

    #[test]
    fn group_after_scalar_starts_on_16_byte_boundary() {
        let layout = UniformLayout::builder()
            .field("offset", UniformType::Int)
            .group("light", &[("direction", UniformType::Vec3)])
            .field("tail", UniformType::Float)
            .build();
        assert_eq!(layout.get("light.direction").unwrap().offset, 16);
        // A field after a group starts past the padded group end.
        assert_eq!(layout.get("tail").unwrap().offset, 32);
    }

    #[test]
    fn empty_layout_still_has_nonzero_size() {
        let layout = UniformLayout::builder().build();
        assert!(layout.is_empty());
        assert_eq!(layout.size(), 16);
    }

    #[test]
    fn mat4_bytes_are_column_major() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let mut floats = [0.0f32; 16];
        UniformValue::Mat4(m).write_bytes(bytemuck::cast_slice_mut(&mut floats));
        assert_eq!(&floats[12..15], &[1.0, 2.0, 3.0]);
    }
}
