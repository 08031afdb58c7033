use wgpu::util::DeviceExt;

use crate::gfx::{DeviceError, MeshDesc, TargetDesc, TextureDesc, TextureKind, VertexLayout};

/// Color format of every offscreen target.
pub(super) const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
pub(super) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub(super) const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

pub(super) struct GpuTarget {
    pub desc: TargetDesc,
    pub color: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub depth_view: Option<wgpu::TextureView>,
}

impl GpuTarget {
    pub fn new(
        device: &wgpu::Device,
        adapter: &wgpu::Adapter,
        desc: &TargetDesc,
    ) -> Result<Self, DeviceError> {
        let max = device.limits().max_texture_dimension_2d;
        let res = desc.resolution;
        if !res.is_valid() || desc.samples == 0 {
            return Err(DeviceError::InvalidDescriptor {
                label: desc.label.clone(),
                details: format!("{}x{} with {} samples", res.width, res.height, desc.samples),
            });
        }
        if res.width > max || res.height > max {
            return Err(DeviceError::Allocation {
                label: desc.label.clone(),
                details: format!("{}x{} exceeds the {max} texel limit", res.width, res.height),
            });
        }
        for format in [COLOR_FORMAT, DEPTH_FORMAT] {
            let flags = adapter.get_texture_format_features(format).flags;
            if !flags.sample_count_supported(desc.samples) {
                return Err(DeviceError::Unsupported(format!(
                    "{}x multisampling of {format:?}",
                    desc.samples
                )));
            }
        }

        let size = wgpu::Extent3d {
            width: res.width,
            height: res.height,
            depth_or_array_layers: 1,
        };
        let color_usage = if desc.samples > 1 {
            wgpu::TextureUsages::RENDER_ATTACHMENT
        } else {
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST
        };

        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size,
            mip_level_count: 1,
            sample_count: desc.samples,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: color_usage,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let depth_view = desc.depth.then(|| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(&format!("{} depth", desc.label)),
                    size,
                    mip_level_count: 1,
                    sample_count: desc.samples,
                    dimension: wgpu::TextureDimension::D2,
                    format: DEPTH_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        Ok(Self {
            desc: desc.clone(),
            color,
            color_view,
            depth_view,
        })
    }
}

pub(super) struct GpuMesh {
    pub buffer: wgpu::Buffer,
    pub layout: VertexLayout,
    pub vertex_count: u32,
}

impl GpuMesh {
    pub fn new(device: &wgpu::Device, desc: &MeshDesc<'_>) -> Result<Self, DeviceError> {
        let per = desc.layout.floats_per_vertex();
        if per == 0 || desc.vertices.is_empty() || desc.vertices.len() % per != 0 {
            return Err(DeviceError::InvalidDescriptor {
                label: desc.label.to_string(),
                details: format!(
                    "{} floats do not form whole {per}-float vertices",
                    desc.vertices.len()
                ),
            });
        }

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(desc.label),
            contents: bytemuck::cast_slice(desc.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(Self {
            buffer,
            layout: desc.layout,
            vertex_count: desc.vertex_count(),
        })
    }
}

pub(super) struct GpuTexture {
    pub kind: TextureKind,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        desc: &TextureDesc<'_>,
    ) -> Result<Self, DeviceError> {
        if desc.width == 0 || desc.height == 0 || desc.pixels.len() != desc.expected_len() {
            return Err(DeviceError::InvalidDescriptor {
                label: desc.label.to_string(),
                details: format!(
                    "{}x{} {:?} needs {} bytes, got {}",
                    desc.width,
                    desc.height,
                    desc.kind,
                    desc.expected_len(),
                    desc.pixels.len()
                ),
            });
        }
        if desc.kind == TextureKind::Cube && desc.width != desc.height {
            return Err(DeviceError::InvalidDescriptor {
                label: desc.label.to_string(),
                details: "cube faces must be square".to_string(),
            });
        }

        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: desc.kind.layers(),
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            desc.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * desc.width),
                rows_per_image: Some(desc.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(view_dimension(desc.kind)),
            ..Default::default()
        });

        Ok(Self { kind: desc.kind, view })
    }

    /// 1x1 opaque white texture sampled when nothing usable is bound.
    pub fn white(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        kind: TextureKind,
    ) -> Result<Self, DeviceError> {
        let pixels = [255u8; 4 * 6];
        let desc = TextureDesc {
            label: "lumen fallback texture",
            kind,
            width: 1,
            height: 1,
            pixels: &pixels[..4 * kind.layers() as usize],
        };
        Self::new(device, queue, &desc)
    }
}

pub(super) fn view_dimension(kind: TextureKind) -> wgpu::TextureViewDimension {
    match kind {
        TextureKind::D2 => wgpu::TextureViewDimension::D2,
        TextureKind::Cube => wgpu::TextureViewDimension::Cube,
    }
}

pub(super) fn create_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("lumen sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}
