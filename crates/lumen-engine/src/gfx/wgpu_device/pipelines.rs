use std::collections::HashMap;
use std::num::NonZeroU64;

use crate::gfx::{
    DepthFunc, DeviceError, ProgramDesc, TextureKind, UniformLayout, UniformValue, VertexLayout,
};

use super::resources::{DEPTH_FORMAT, view_dimension};

/// Depth state a pipeline is built for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(super) enum DepthMode {
    /// The target has no depth attachment.
    Detached,
    /// Attachment present, test off (always passes, no writes).
    Disabled,
    Test(DepthFunc),
}

/// Everything besides the program that selects a render pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(super) struct PipelineKey {
    pub layout: VertexLayout,
    pub format: wgpu::TextureFormat,
    pub samples: u32,
    pub depth: DepthMode,
}

/// A linked program: both stage modules, its bind group layouts and the
/// pipelines built for it so far.
///
/// Group 0 is the uniform block (dynamic offset); group 1, when the program
/// samples a texture, is texture (binding 0) + sampler (binding 1).
pub(super) struct GpuProgram {
    pub label: String,
    pub uniforms: UniformLayout,
    /// Current uniform block contents; snapshotted per draw.
    pub staging: Vec<u8>,
    pub texture: Option<TextureKind>,
    pub uniform_bgl: wgpu::BindGroupLayout,
    pub texture_bgl: Option<wgpu::BindGroupLayout>,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl GpuProgram {
    pub fn compile(device: &wgpu::Device, desc: &ProgramDesc<'_>) -> Result<Self, DeviceError> {
        let vertex = compile_stage(device, desc.label, "vertex", desc.vertex)?;
        let fragment = compile_stage(device, desc.label, "fragment", desc.fragment)?;

        let block_size = desc.uniforms.size() as u64;
        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} uniforms", desc.label)),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(block_size),
                },
                count: None,
            }],
        });

        let texture_bgl = desc.texture.map(|kind| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{} texture", desc.label)),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: view_dimension(kind),
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            })
        });

        let mut groups = vec![&uniform_bgl];
        groups.extend(texture_bgl.as_ref());
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} pipeline layout", desc.label)),
            bind_group_layouts: &groups,
            immediate_size: 0,
        });

        Ok(Self {
            label: desc.label.to_string(),
            uniforms: desc.uniforms.clone(),
            staging: vec![0; desc.uniforms.size()],
            texture: desc.texture,
            uniform_bgl,
            texture_bgl,
            vertex,
            fragment,
            layout,
            pipelines: HashMap::new(),
        })
    }

    /// Writes `value` into the staging block. Unknown names and type
    /// mismatches are logged and ignored.
    pub fn write_uniform(&mut self, name: &str, value: UniformValue) {
        match self.uniforms.get(name) {
            Some(slot) if slot.ty == value.ty() => {
                let end = slot.offset + slot.ty.size();
                value.write_bytes(&mut self.staging[slot.offset..end]);
            }
            Some(slot) => log::warn!(
                "uniform '{name}' on '{}' is {:?}, got {:?}",
                self.label,
                slot.ty,
                value.ty()
            ),
            None => log::warn!("program '{}' declares no uniform '{name}'", self.label),
        }
    }

    pub fn pipeline(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    pub fn ensure_pipeline(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        log::debug!("building pipeline for '{}': {key:?}", self.label);

        let attributes: Vec<wgpu::VertexAttribute> = key
            .layout
            .attributes
            .iter()
            .enumerate()
            .map(|(i, a)| wgpu::VertexAttribute {
                format: vertex_format(a.components),
                offset: (key.layout.float_offset(i) * std::mem::size_of::<f32>()) as u64,
                shader_location: a.location,
            })
            .collect();

        let depth_stencil = match key.depth {
            DepthMode::Detached => None,
            DepthMode::Disabled => Some(depth_state(wgpu::CompareFunction::Always, false)),
            DepthMode::Test(func) => Some(depth_state(compare_function(func), true)),
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&self.label),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module: &self.vertex,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: key.layout.stride(),
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.fragment,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil,
            multisample: wgpu::MultisampleState {
                count: key.samples,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
            cache: None,
        });

        self.pipelines.insert(key, pipeline);
    }
}

fn compile_stage(
    device: &wgpu::Device,
    label: &str,
    stage: &str,
    source: &str,
) -> Result<wgpu::ShaderModule, DeviceError> {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{label} {stage}")),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let info = pollster::block_on(module.get_compilation_info());
    let errors: Vec<String> = info
        .messages
        .iter()
        .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
        .map(|m| match &m.location {
            Some(loc) => format!("{stage} {}:{}: {}", loc.line_number, loc.line_position, m.message),
            None => format!("{stage}: {}", m.message),
        })
        .collect();

    for warning in info
        .messages
        .iter()
        .filter(|m| m.message_type == wgpu::CompilationMessageType::Warning)
    {
        log::warn!("{label} {stage}: {}", warning.message);
    }

    if errors.is_empty() {
        Ok(module)
    } else {
        Err(DeviceError::Compilation {
            label: label.to_string(),
            details: errors.join("\n"),
        })
    }
}

fn depth_state(compare: wgpu::CompareFunction, write: bool) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

fn vertex_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

pub(super) fn compare_function(func: DepthFunc) -> wgpu::CompareFunction {
    match func {
        DepthFunc::Less => wgpu::CompareFunction::Less,
        DepthFunc::LessEqual => wgpu::CompareFunction::LessEqual,
        DepthFunc::Always => wgpu::CompareFunction::Always,
    }
}
