use slotmap::new_key_type;

new_key_type! {
    /// Handle to an offscreen color (+ optional depth) target.
    pub struct TargetId;
    /// Handle to a compiled and linked shader program.
    pub struct ProgramId;
    /// Handle to an uploaded vertex buffer.
    pub struct MeshId;
    /// Handle to a sampled texture (2D or cube).
    pub struct TextureId;
}

/// Drawable size in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    #[inline]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Width over height. Returns 1.0 for degenerate sizes.
    #[inline]
    pub fn aspect(self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Region covering the whole resolution.
    #[inline]
    pub const fn full_region(self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }
}

/// Pixel rectangle (origin top-left).
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Destination for draw and clear commands.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RenderTarget {
    /// The display's default framebuffer (window surface).
    Screen,
    /// An offscreen target created with [`GraphicsDevice::create_target`].
    ///
    /// [`GraphicsDevice::create_target`]: super::GraphicsDevice::create_target
    Offscreen(TargetId),
}

/// Depth comparison used while depth testing is enabled.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum DepthFunc {
    #[default]
    Less,
    LessEqual,
    Always,
}

impl DepthFunc {
    /// Returns whether a fragment at `incoming` depth passes against `stored`.
    #[inline]
    pub fn passes(self, incoming: f32, stored: f32) -> bool {
        match self {
            DepthFunc::Less => incoming < stored,
            DepthFunc::LessEqual => incoming <= stored,
            DepthFunc::Always => true,
        }
    }
}

/// Offscreen target allocation parameters.
#[derive(Debug, Clone)]
pub struct TargetDesc {
    pub label: String,
    pub resolution: Resolution,
    /// 1 for a plain target, N > 1 for a multisampled one.
    pub samples: u32,
    pub depth: bool,
}

/// Texture dimensionality.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TextureKind {
    #[default]
    D2,
    /// Six square faces in +X, -X, +Y, -Y, +Z, -Z order.
    Cube,
}

impl TextureKind {
    #[inline]
    pub const fn layers(self) -> u32 {
        match self {
            TextureKind::D2 => 1,
            TextureKind::Cube => 6,
        }
    }
}

/// Texture upload parameters. `pixels` is tightly packed RGBA8, all layers
/// concatenated.
#[derive(Debug, Clone)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub kind: TextureKind,
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
}

impl TextureDesc<'_> {
    /// Byte length `pixels` must have.
    #[inline]
    pub const fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4 * self.kind.layers() as usize
    }
}

/// What a texture unit samples from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureSource {
    Texture(TextureId),
    /// Color attachment of a single-sampled offscreen target.
    TargetColor(TargetId),
}

/// Live resource counters, used to verify release on shutdown.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ResourceCounts {
    pub targets: usize,
    pub programs: usize,
    pub meshes: usize,
    pub textures: usize,
}

impl ResourceCounts {
    #[inline]
    pub const fn total(self) -> usize {
        self.targets + self.programs + self.meshes + self.textures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_func_less_rejects_equal() {
        assert!(!DepthFunc::Less.passes(1.0, 1.0));
        assert!(DepthFunc::LessEqual.passes(1.0, 1.0));
        assert!(DepthFunc::Always.passes(2.0, 1.0));
    }

    #[test]
    fn resolution_full_region_covers_everything() {
        let r = Resolution::new(640, 480);
        assert_eq!(r.full_region(), Region::new(0, 0, 640, 480));
        assert_eq!(r.pixel_count(), 640 * 480);
        assert!(!Resolution::new(0, 480).is_valid());
    }

    #[test]
    fn cube_texture_expects_six_layers() {
        let desc = TextureDesc {
            label: "sky",
            kind: TextureKind::Cube,
            width: 2,
            height: 2,
            pixels: &[],
        };
        assert_eq!(desc.expected_len(), 2 * 2 * 4 * 6);
    }
}
