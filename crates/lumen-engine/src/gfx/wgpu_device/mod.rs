//! [`GraphicsDevice`] on top of wgpu.
//!
//! Immediate-mode calls are batched: clears and draws aimed at the same target
//! accumulate in a pending pass that is encoded and submitted when the target
//! changes, a blit is issued, or the frame is presented. Uniform values are
//! snapshotted per draw into a dynamic-offset arena, so each draw sees the
//! values set before it.

mod pipelines;
mod resources;

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::ops::Range;

use slotmap::SlotMap;
use winit::dpi::PhysicalSize;

use crate::device::{Gpu, SurfaceErrorAction, SurfaceFrame};
use crate::gfx::uniform::align_to;

use super::{
    Color, DepthFunc, DeviceError, Display, GraphicsDevice, MeshDesc, MeshId, ProgramDesc,
    ProgramId, Region, RenderTarget, Resolution, ResourceCounts, TargetDesc, TargetId,
    TextureDesc, TextureId, TextureKind, TextureSource, UniformValue,
};

use pipelines::{DepthMode, GpuProgram, PipelineKey};
use resources::{COLOR_FORMAT, GpuMesh, GpuTarget, GpuTexture};

struct DrawOp {
    program: ProgramId,
    mesh: MeshId,
    vertices: Range<u32>,
    uniform_offset: u32,
    texture: Option<TextureSource>,
    key: PipelineKey,
}

/// Work recorded for one target and not yet submitted.
struct PendingPass {
    target: RenderTarget,
    clear: Option<Color>,
    clear_depth: bool,
    draws: Vec<DrawOp>,
}

impl PendingPass {
    fn new(target: RenderTarget) -> Self {
        Self {
            target,
            clear: None,
            clear_depth: false,
            draws: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.clear.is_none() && self.draws.is_empty()
    }
}

/// Per-draw uniform block snapshots, uploaded once per pass.
struct UniformArena {
    bytes: Vec<u8>,
    align: usize,
    buffer: Option<wgpu::Buffer>,
}

impl UniformArena {
    fn push(&mut self, block: &[u8]) -> u32 {
        let offset = align_to(self.bytes.len(), self.align);
        self.bytes.resize(offset, 0);
        self.bytes.extend_from_slice(block);
        offset as u32
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Option<wgpu::Buffer> {
        if self.bytes.is_empty() {
            return None;
        }
        let needed = self.bytes.len() as u64;
        let grow = self.buffer.as_ref().is_none_or(|b| b.size() < needed);
        if grow {
            let size = needed.next_power_of_two().max(1024);
            log::debug!("uniform arena grown to {size} bytes");
            self.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("lumen uniform arena"),
                size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }
        let buffer = self.buffer.clone()?;
        queue.write_buffer(&buffer, 0, &self.bytes);
        Some(buffer)
    }

    fn reset(&mut self) {
        self.bytes.clear();
    }
}

#[derive(Debug)]
struct BindState {
    target: RenderTarget,
    program: Option<ProgramId>,
    depth_test: bool,
    depth_func: DepthFunc,
    units: HashMap<u32, TextureSource>,
}

/// wgpu-backed graphics device drawing to a window surface.
pub struct WgpuDevice<'w> {
    gpu: Gpu<'w>,
    targets: SlotMap<TargetId, GpuTarget>,
    programs: SlotMap<ProgramId, GpuProgram>,
    meshes: SlotMap<MeshId, GpuMesh>,
    textures: SlotMap<TextureId, GpuTexture>,
    sampler: wgpu::Sampler,
    white_2d: GpuTexture,
    white_cube: GpuTexture,
    state: BindState,
    pending: Option<PendingPass>,
    arena: UniformArena,
    frame: Option<SurfaceFrame>,
    surface_lost: bool,
}

impl<'w> WgpuDevice<'w> {
    pub fn new(gpu: Gpu<'w>) -> Result<Self, DeviceError> {
        let device = gpu.device();
        let queue = gpu.queue();
        let sampler = resources::create_sampler(device);
        let white_2d = GpuTexture::white(device, queue, TextureKind::D2)?;
        let white_cube = GpuTexture::white(device, queue, TextureKind::Cube)?;
        let align = device.limits().min_uniform_buffer_offset_alignment as usize;

        Ok(Self {
            gpu,
            targets: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            sampler,
            white_2d,
            white_cube,
            state: BindState {
                target: RenderTarget::Screen,
                program: None,
                depth_test: false,
                depth_func: DepthFunc::Less,
                units: HashMap::new(),
            },
            pending: None,
            arena: UniformArena {
                bytes: Vec::new(),
                align,
                buffer: None,
            },
            frame: None,
            surface_lost: false,
        })
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    /// Reconfigures the surface. Work recorded for the old swapchain image is
    /// submitted and the image is dropped without presenting.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.flush();
        self.frame = None;
        self.gpu.resize(size);
    }

    /// True once surface acquisition failed unrecoverably.
    pub fn surface_lost(&self) -> bool {
        self.surface_lost
    }

    /// Format, sample count and depth presence of `target`.
    fn target_info(&self, target: RenderTarget) -> Option<(wgpu::TextureFormat, u32, bool)> {
        match target {
            RenderTarget::Screen => Some((self.gpu.surface_format(), 1, false)),
            RenderTarget::Offscreen(id) => self
                .targets
                .get(id)
                .map(|t| (COLOR_FORMAT, t.desc.samples, t.depth_view.is_some())),
        }
    }

    /// Returns the pending pass for the bound target, submitting work recorded
    /// for a different target first.
    fn pending_pass(&mut self) -> &mut PendingPass {
        let target = self.state.target;
        if self.pending.as_ref().is_some_and(|p| p.target != target) {
            self.flush();
        }
        self.pending.get_or_insert_with(|| PendingPass::new(target))
    }

    /// View sampled for `source`, falling back to white when the source is
    /// missing, multisampled, or of the wrong kind.
    fn texture_view(&self, source: Option<TextureSource>, kind: TextureKind) -> &wgpu::TextureView {
        let view = match source {
            Some(TextureSource::Texture(id)) => self
                .textures
                .get(id)
                .filter(|t| t.kind == kind)
                .map(|t| &t.view),
            Some(TextureSource::TargetColor(id)) => self
                .targets
                .get(id)
                .filter(|t| kind == TextureKind::D2 && t.desc.samples == 1)
                .map(|t| &t.color_view),
            None => None,
        };
        view.unwrap_or(match kind {
            TextureKind::D2 => &self.white_2d.view,
            TextureKind::Cube => &self.white_cube.view,
        })
    }

    /// Encodes and submits the pending pass.
    fn flush(&mut self) {
        let Some(pass) = self.pending.take() else { return };
        if pass.is_empty() {
            return;
        }

        if pass.target == RenderTarget::Screen && self.frame.is_none() {
            match self.gpu.acquire() {
                Ok(frame) => self.frame = Some(frame),
                Err(action) => {
                    if action == SurfaceErrorAction::Fatal {
                        self.surface_lost = true;
                    }
                    self.arena.reset();
                    return;
                }
            }
        }

        let device = self.gpu.device();
        for op in &pass.draws {
            if let Some(program) = self.programs.get_mut(op.program) {
                program.ensure_pipeline(device, op.key);
            }
        }

        let arena = self.arena.upload(device, self.gpu.queue());

        let mut uniform_groups: HashMap<ProgramId, wgpu::BindGroup> = HashMap::new();
        let mut texture_groups: Vec<Option<wgpu::BindGroup>> = Vec::with_capacity(pass.draws.len());
        for op in &pass.draws {
            let Some(program) = self.programs.get(op.program) else {
                texture_groups.push(None);
                continue;
            };
            if let Some(buffer) = arena.as_ref() {
                uniform_groups.entry(op.program).or_insert_with(|| {
                    device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some(&program.label),
                        layout: &program.uniform_bgl,
                        entries: &[wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                                buffer,
                                offset: 0,
                                size: NonZeroU64::new(program.uniforms.size() as u64),
                            }),
                        }],
                    })
                });
            }
            let group = program.texture_bgl.as_ref().zip(program.texture).map(|(bgl, kind)| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&program.label),
                    layout: bgl,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(
                                self.texture_view(op.texture, kind),
                            ),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&self.sampler),
                        },
                    ],
                })
            });
            texture_groups.push(group);
        }

        let (color_view, depth_view) = match pass.target {
            RenderTarget::Screen => match self.frame.as_ref() {
                Some(frame) => (&frame.view, None),
                None => return,
            },
            RenderTarget::Offscreen(id) => match self.targets.get(id) {
                Some(t) => (&t.color_view, t.depth_view.as_ref()),
                None => {
                    log::warn!("pass dropped: target {id:?} no longer exists");
                    self.arena.reset();
                    return;
                }
            },
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lumen pass encoder"),
        });
        {
            let load = match pass.clear {
                Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                    r: c.r as f64,
                    g: c.g as f64,
                    b: c.b as f64,
                    a: c.a as f64,
                }),
                None => wgpu::LoadOp::Load,
            };
            let depth_load = if pass.clear_depth {
                wgpu::LoadOp::Clear(1.0)
            } else {
                wgpu::LoadOp::Load
            };

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lumen pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: depth_view.map(|view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: depth_load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for (op, texture_group) in pass.draws.iter().zip(&texture_groups) {
                let Some(program) = self.programs.get(op.program) else { continue };
                let Some(pipeline) = program.pipeline(&op.key) else { continue };
                let Some(mesh) = self.meshes.get(op.mesh) else { continue };
                let Some(uniforms) = uniform_groups.get(&op.program) else { continue };

                let end = op.vertices.end.min(mesh.vertex_count);
                let start = op.vertices.start.min(end);

                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(0, uniforms, &[op.uniform_offset]);
                if let Some(group) = texture_group {
                    rpass.set_bind_group(1, group, &[]);
                }
                rpass.set_vertex_buffer(0, mesh.buffer.slice(..));
                rpass.draw(start..end, 0..1);
            }
        }

        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        self.arena.reset();
    }
}

impl Display for WgpuDevice<'_> {
    fn resolution(&self) -> Resolution {
        let size = self.gpu.size();
        Resolution::new(size.width, size.height)
    }

    fn swap_buffers(&mut self) {
        self.flush();
        match self.frame.take() {
            Some(frame) => frame.present(),
            None => log::trace!("swap_buffers: nothing was drawn to the screen"),
        }
    }
}

impl GraphicsDevice for WgpuDevice<'_> {
    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId, DeviceError> {
        let target = GpuTarget::new(self.gpu.device(), self.gpu.adapter(), desc)?;
        log::debug!(
            "target '{}' created: {}x{} x{}{}",
            desc.label,
            desc.resolution.width,
            desc.resolution.height,
            desc.samples,
            if desc.depth { " +depth" } else { "" }
        );
        Ok(self.targets.insert(target))
    }

    fn destroy_target(&mut self, id: TargetId) {
        self.flush();
        if self.targets.remove(id).is_none() {
            log::warn!("destroy of unknown target {id:?}");
        }
        if self.state.target == RenderTarget::Offscreen(id) {
            self.state.target = RenderTarget::Screen;
        }
        self.state.units.retain(|_, s| *s != TextureSource::TargetColor(id));
    }

    fn bind_target(&mut self, target: RenderTarget) {
        if self.target_info(target).is_none() {
            log::warn!("bind of unknown target {target:?}");
        }
        self.state.target = target;
    }

    fn clear(&mut self, color: Color, clear_depth: bool) {
        if self.pending.as_ref().is_some_and(|p| !p.draws.is_empty()) {
            self.flush();
        }
        let pass = self.pending_pass();
        pass.clear = Some(color);
        pass.clear_depth |= clear_depth;
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.state.depth_test = enabled;
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.state.depth_func = func;
    }

    fn blit(&mut self, src: TargetId, dst: TargetId, region: Region) {
        self.flush();
        if src == dst {
            log::warn!("blit source and destination are the same target");
            return;
        }
        let (Some(s), Some(d)) = (self.targets.get(src), self.targets.get(dst)) else {
            log::warn!("blit between unknown targets {src:?} -> {dst:?}");
            return;
        };

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lumen blit encoder"),
            });

        if s.desc.samples > 1 {
            if d.desc.samples != 1 || s.desc.resolution != d.desc.resolution {
                log::error!(
                    "multisample resolve needs a single-sampled target of the same size ({:?} -> {:?})",
                    s.desc.resolution,
                    d.desc.resolution
                );
                return;
            }
            if region != s.desc.resolution.full_region() {
                log::debug!("partial multisample resolve widened to the full target");
            }
            let _resolve = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lumen resolve pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &s.color_view,
                    resolve_target: Some(&d.color_view),
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        } else {
            if d.desc.samples != 1 {
                log::error!("cannot blit into a multisampled target");
                return;
            }
            let width = (region.x + region.width)
                .min(s.desc.resolution.width)
                .min(d.desc.resolution.width)
                .saturating_sub(region.x);
            let height = (region.y + region.height)
                .min(s.desc.resolution.height)
                .min(d.desc.resolution.height)
                .saturating_sub(region.y);
            if width == 0 || height == 0 {
                return;
            }
            let origin = wgpu::Origin3d { x: region.x, y: region.y, z: 0 };
            encoder.copy_texture_to_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &s.color,
                    mip_level: 0,
                    origin,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyTextureInfo {
                    texture: &d.color,
                    mip_level: 0,
                    origin,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            );
        }

        self.gpu.queue().submit(std::iter::once(encoder.finish()));
    }

    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, DeviceError> {
        let program = GpuProgram::compile(self.gpu.device(), desc)?;
        log::debug!("program '{}' compiled", desc.label);
        Ok(self.programs.insert(program))
    }

    fn destroy_program(&mut self, id: ProgramId) {
        self.flush();
        if self.programs.remove(id).is_none() {
            log::warn!("destroy of unknown program {id:?}");
        }
        if self.state.program == Some(id) {
            self.state.program = None;
        }
    }

    fn use_program(&mut self, id: ProgramId) {
        if self.programs.contains_key(id) {
            self.state.program = Some(id);
        } else {
            log::warn!("use of unknown program {id:?}");
        }
    }

    fn active_program(&self) -> Option<ProgramId> {
        self.state.program
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let Some(program) = self.state.program.and_then(|id| self.programs.get_mut(id)) else {
            log::error!("uniform '{name}' set with no active program");
            return;
        };
        program.write_uniform(name, value);
    }

    fn create_mesh(&mut self, desc: &MeshDesc<'_>) -> Result<MeshId, DeviceError> {
        let mesh = GpuMesh::new(self.gpu.device(), desc)?;
        Ok(self.meshes.insert(mesh))
    }

    fn destroy_mesh(&mut self, id: MeshId) {
        self.flush();
        if self.meshes.remove(id).is_none() {
            log::warn!("destroy of unknown mesh {id:?}");
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId, DeviceError> {
        let texture = GpuTexture::new(self.gpu.device(), self.gpu.queue(), desc)?;
        Ok(self.textures.insert(texture))
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.flush();
        if self.textures.remove(id).is_none() {
            log::warn!("destroy of unknown texture {id:?}");
        }
        self.state.units.retain(|_, s| *s != TextureSource::Texture(id));
    }

    fn bind_texture(&mut self, unit: u32, source: TextureSource) {
        if unit != 0 {
            log::debug!("texture unit {unit} is not sampled by any program");
        }
        self.state.units.insert(unit, source);
    }

    fn draw(&mut self, mesh: MeshId, vertices: Range<u32>) {
        let Some(program_id) = self.state.program else {
            log::warn!("draw with no active program");
            return;
        };
        let Some(layout) = self.meshes.get(mesh).map(|m| m.layout) else {
            log::warn!("draw of unknown mesh {mesh:?}");
            return;
        };
        let Some((format, samples, has_depth)) = self.target_info(self.state.target) else {
            log::warn!("draw into unknown target {:?}", self.state.target);
            return;
        };
        let depth = match (has_depth, self.state.depth_test) {
            (false, _) => DepthMode::Detached,
            (true, false) => DepthMode::Disabled,
            (true, true) => DepthMode::Test(self.state.depth_func),
        };
        let texture = self.state.units.get(&0).copied();

        // Flush a stale pass before snapshotting into the arena it would reset.
        self.pending_pass();
        let Some(program) = self.programs.get(program_id) else { return };
        let uniform_offset = self.arena.push(&program.staging);

        self.pending_pass().draws.push(DrawOp {
            program: program_id,
            mesh,
            vertices,
            uniform_offset,
            texture,
            key: PipelineKey { layout, format, samples, depth },
        });
    }

    fn live_resources(&self) -> ResourceCounts {
        ResourceCounts {
            targets: self.targets.len(),
            programs: self.programs.len(),
            meshes: self.meshes.len(),
            textures: self.textures.len(),
        }
    }
}
