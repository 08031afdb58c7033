//! Headless CPU reference device.
//!
//! `SoftDevice` implements [`GraphicsDevice`] with plain memory so the frame
//! pipeline can run without a GPU. It keeps an ordered log of every call and
//! can read back any target, which is what the pipeline tests assert against.
//!
//! Programs are not compiled; the device emulates the built-in shaders:
//! - 2-component positions are NDC; 3-component positions are transformed by
//!   the active program's `MVP`, or by `VP` with depth pinned to the far plane
//!   (the skybox convention), or passed through when neither is set
//! - fragments sample texture unit 0 (2D by the first 2-component attribute
//!   after the position, cube maps by the object-space position), or are
//!   white when the program samples nothing or the bound texture has the
//!   wrong kind
//! - the screen program's time effect is not emulated (plain copy)

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use glam::{Vec3, Vec4};
use slotmap::SlotMap;

use super::{
    Color, DepthFunc, DeviceError, Display, GraphicsDevice, MeshDesc, MeshId, ProgramDesc,
    ProgramId, Region, RenderTarget, Resolution, ResourceCounts, TargetDesc, TargetId,
    TextureDesc, TextureId, TextureKind, TextureSource, UniformLayout, UniformValue,
    VertexLayout,
};

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    CreateTarget(TargetId),
    DestroyTarget(TargetId),
    BindTarget(RenderTarget),
    Clear { target: RenderTarget, color: Color, depth: bool },
    DepthTest(bool),
    DepthFunc(DepthFunc),
    Blit { src: TargetId, dst: TargetId, region: Region },
    CreateProgram(ProgramId),
    DestroyProgram(ProgramId),
    UseProgram(ProgramId),
    Uniform { program: ProgramId, name: String, value: UniformValue },
    CreateMesh(MeshId),
    DestroyMesh(MeshId),
    CreateTexture(TextureId),
    DestroyTexture(TextureId),
    BindTexture { unit: u32, source: TextureSource },
    Draw {
        target: RenderTarget,
        program: Option<ProgramId>,
        mesh: MeshId,
        vertices: Range<u32>,
        depth_func: DepthFunc,
    },
    SwapBuffers,
}

#[derive(Debug, Clone)]
struct SoftTarget {
    resolution: Resolution,
    samples: u32,
    color: Vec<[f32; 4]>,
    depth: Option<Vec<f32>>,
}

impl SoftTarget {
    fn new(resolution: Resolution, samples: u32, depth: bool) -> Self {
        let len = resolution.pixel_count() * samples as usize;
        Self {
            resolution,
            samples,
            color: vec![[0.0; 4]; len],
            depth: depth.then(|| vec![1.0; len]),
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32, sample: u32) -> usize {
        ((y as usize * self.resolution.width as usize) + x as usize) * self.samples as usize
            + sample as usize
    }

    /// Sample-averaged color of one pixel.
    fn resolved(&self, x: u32, y: u32) -> [f32; 4] {
        let mut acc = [0.0f32; 4];
        for s in 0..self.samples {
            let c = self.color[self.index(x, y, s)];
            for (a, v) in acc.iter_mut().zip(c) {
                *a += v;
            }
        }
        let n = self.samples as f32;
        acc.map(|v| v / n)
    }

    fn resolved_pixels(&self) -> Vec<[f32; 4]> {
        let Resolution { width, height } = self.resolution;
        (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| self.resolved(x, y))
            .collect()
    }
}

#[derive(Debug)]
struct SoftProgram {
    label: String,
    layout: UniformLayout,
    texture: Option<TextureKind>,
    values: HashMap<String, UniformValue>,
}

#[derive(Debug)]
struct SoftMesh {
    layout: VertexLayout,
    vertices: Vec<f32>,
}

#[derive(Debug)]
struct SoftTexture {
    kind: TextureKind,
    width: u32,
    height: u32,
    texels: Vec<[f32; 4]>,
}

impl SoftTexture {
    fn sample_cube(&self, dir: Vec3) -> [f32; 4] {
        let (face, sc, tc, ma) = cube_face(dir);
        if ma <= f32::EPSILON {
            return [0.0; 4];
        }
        let s = (sc / ma + 1.0) * 0.5;
        let t = (tc / ma + 1.0) * 0.5;
        let x = texel_coord(s, self.width);
        let y = texel_coord(t, self.height);
        let face_len = (self.width * self.height) as usize;
        self.texels[face * face_len + (y * self.width + x) as usize]
    }

    fn sample(&self, uv: [f32; 2], dir: Vec3) -> [f32; 4] {
        match self.kind {
            TextureKind::D2 => sample_2d(&self.texels, self.width, self.height, uv),
            TextureKind::Cube => self.sample_cube(dir),
        }
    }
}

/// Borrowed view of whatever texture unit 0 samples during one draw.
#[derive(Debug, Copy, Clone)]
enum Sampler<'a> {
    Texture(&'a SoftTexture),
    /// Single-sampled target color, read in place.
    Target(&'a SoftTarget),
}

impl Sampler<'_> {
    fn kind(&self) -> TextureKind {
        match self {
            Sampler::Texture(t) => t.kind,
            Sampler::Target(_) => TextureKind::D2,
        }
    }

    fn sample(&self, uv: [f32; 2], dir: Vec3) -> [f32; 4] {
        match self {
            Sampler::Texture(t) => t.sample(uv, dir),
            Sampler::Target(t) => {
                sample_2d(&t.color, t.resolution.width, t.resolution.height, uv)
            }
        }
    }
}

fn target_sampler(target: &SoftTarget) -> Option<Sampler<'_>> {
    if target.samples != 1 {
        log::warn!("SoftDevice: cannot sample a multisampled target");
        return None;
    }
    Some(Sampler::Target(target))
}

/// Nearest-texel lookup in a row-major texel grid; v = 1 is the top row.
fn sample_2d(texels: &[[f32; 4]], width: u32, height: u32, uv: [f32; 2]) -> [f32; 4] {
    let x = texel_coord(uv[0], width);
    let y = texel_coord(1.0 - uv[1], height);
    texels[(y * width + x) as usize]
}

#[inline]
fn texel_coord(t: f32, size: u32) -> u32 {
    ((t * size as f32).floor().max(0.0) as u32).min(size.saturating_sub(1))
}

/// Major-axis face selection: (face, sc, tc, |ma|).
fn cube_face(d: Vec3) -> (usize, f32, f32, f32) {
    let (ax, ay, az) = (d.x.abs(), d.y.abs(), d.z.abs());
    if ax >= ay && ax >= az {
        if d.x >= 0.0 { (0, -d.z, -d.y, ax) } else { (1, d.z, -d.y, ax) }
    } else if ay >= az {
        if d.y >= 0.0 { (2, d.x, d.z, ay) } else { (3, d.x, -d.z, ay) }
    } else if d.z >= 0.0 {
        (4, d.x, -d.y, az)
    } else {
        (5, -d.x, -d.y, az)
    }
}

/// Vertex after the emulated vertex stage: screen-space position plus varyings.
#[derive(Debug, Copy, Clone)]
struct RasterVertex {
    x: f32,
    y: f32,
    z: f32,
    uv: [f32; 2],
    dir: Vec3,
}

/// Headless reference implementation of [`GraphicsDevice`].
#[derive(Debug)]
pub struct SoftDevice {
    screen: SoftTarget,
    targets: SlotMap<TargetId, SoftTarget>,
    programs: SlotMap<ProgramId, SoftProgram>,
    meshes: SlotMap<MeshId, SoftMesh>,
    textures: SlotMap<TextureId, SoftTexture>,

    bound: RenderTarget,
    active: Option<ProgramId>,
    depth_test: bool,
    depth_func: DepthFunc,
    units: HashMap<u32, TextureSource>,

    events: Vec<DeviceEvent>,
    presented: usize,
    last_presented: Option<Vec<[f32; 4]>>,

    rejected_programs: HashSet<String>,
    rejected_samples: HashSet<u32>,
}

impl SoftDevice {
    /// Creates a device whose default framebuffer has `resolution`.
    pub fn new(resolution: Resolution) -> Self {
        Self {
            screen: SoftTarget::new(resolution, 1, true),
            targets: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            bound: RenderTarget::Screen,
            active: None,
            depth_test: false,
            depth_func: DepthFunc::Less,
            units: HashMap::new(),
            events: Vec::new(),
            presented: 0,
            last_presented: None,
            rejected_programs: HashSet::new(),
            rejected_samples: HashSet::new(),
        }
    }

    /// Makes `create_program` fail for programs with this label.
    pub fn reject_program(&mut self, label: impl Into<String>) {
        self.rejected_programs.insert(label.into());
    }

    /// Makes `create_target` fail for targets with this sample count.
    pub fn reject_targets_with_samples(&mut self, samples: u32) {
        self.rejected_samples.insert(samples);
    }

    /// Simulates a window resize; the default framebuffer is reallocated.
    pub fn resize_display(&mut self, resolution: Resolution) {
        self.screen = SoftTarget::new(resolution, 1, true);
    }

    /// Every call made so far, in order.
    pub fn events(&self) -> &[DeviceEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Number of completed `swap_buffers` calls.
    pub fn presented_frames(&self) -> usize {
        self.presented
    }

    /// Screen contents captured by the last `swap_buffers`.
    pub fn last_presented(&self) -> Option<&[[f32; 4]]> {
        self.last_presented.as_deref()
    }

    /// Sample-averaged pixels of `target`, row-major, top row first.
    pub fn read_target(&self, target: RenderTarget) -> Option<Vec<[f32; 4]>> {
        self.target(target).map(SoftTarget::resolved_pixels)
    }

    /// Sample-averaged color of one pixel of `target`.
    pub fn read_pixel(&self, target: RenderTarget, x: u32, y: u32) -> Option<[f32; 4]> {
        let t = self.target(target)?;
        (x < t.resolution.width && y < t.resolution.height).then(|| t.resolved(x, y))
    }

    /// Overwrites one sample of an offscreen target. Returns `false` if the
    /// target, pixel or sample does not exist.
    pub fn write_sample(
        &mut self,
        target: TargetId,
        x: u32,
        y: u32,
        sample: u32,
        color: [f32; 4],
    ) -> bool {
        let Some(t) = self.targets.get_mut(target) else { return false };
        if x >= t.resolution.width || y >= t.resolution.height || sample >= t.samples {
            return false;
        }
        let i = t.index(x, y, sample);
        t.color[i] = color;
        true
    }

    /// Value last set for `name` on `program`.
    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        self.programs.get(program)?.values.get(name).copied()
    }

    pub fn bound_target(&self) -> RenderTarget {
        self.bound
    }

    pub fn depth_state(&self) -> (bool, DepthFunc) {
        (self.depth_test, self.depth_func)
    }

    /// Label the program was created with.
    pub fn program_label(&self, program: ProgramId) -> Option<&str> {
        self.programs.get(program).map(|p| p.label.as_str())
    }

    fn target(&self, target: RenderTarget) -> Option<&SoftTarget> {
        match target {
            RenderTarget::Screen => Some(&self.screen),
            RenderTarget::Offscreen(id) => self.targets.get(id),
        }
    }

    fn target_mut(&mut self, target: RenderTarget) -> Option<&mut SoftTarget> {
        match target {
            RenderTarget::Screen => Some(&mut self.screen),
            RenderTarget::Offscreen(id) => self.targets.get_mut(id),
        }
    }

    /// Emulated vertex stage. Returns `None` for vertices behind the eye.
    fn transform_vertex(
        layout: &VertexLayout,
        vertex: &[f32],
        program: &SoftProgram,
        resolution: Resolution,
    ) -> Option<RasterVertex> {
        let pos_components = layout.attributes.first()?.components as usize;
        let p = &vertex[..pos_components];

        let (ndc, dir) = if pos_components < 2 {
            return None;
        } else if pos_components == 2 {
            (Vec3::new(p[0], p[1], 0.0), Vec3::ZERO)
        } else {
            let obj = Vec3::new(p[0], p[1], p[2]);
            let clip = match (program.values.get("MVP"), program.values.get("VP")) {
                (Some(UniformValue::Mat4(mvp)), _) => *mvp * obj.extend(1.0),
                (_, Some(UniformValue::Mat4(vp))) => {
                    let c = *vp * obj.extend(1.0);
                    Vec4::new(c.x, c.y, c.w, c.w)
                }
                _ => obj.extend(1.0),
            };
            if clip.w <= 1e-6 {
                return None;
            }
            (clip.truncate() / clip.w, obj)
        };

        let uv = layout
            .attributes
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, a)| a.components == 2)
            .map(|(i, _)| {
                let o = layout.float_offset(i);
                [vertex[o], vertex[o + 1]]
            })
            .unwrap_or([0.0, 0.0]);

        Some(RasterVertex {
            x: (ndc.x + 1.0) * 0.5 * resolution.width as f32,
            y: (1.0 - ndc.y) * 0.5 * resolution.height as f32,
            z: ndc.z,
            uv,
            dir,
        })
    }

    fn record(&mut self, event: DeviceEvent) {
        log::trace!("SoftDevice: {event:?}");
        self.events.push(event);
    }
}

/// Rasterizes one triangle into every sample of the covered pixels.
fn rasterize(
    target: &mut SoftTarget,
    tri: [RasterVertex; 3],
    depth: Option<DepthFunc>,
    shade: &dyn Fn([f32; 2], Vec3) -> [f32; 4],
) {
    let [a, b, c] = tri;
    let area = edge(&a, &b, c.x, c.y);
    if area.abs() <= f32::EPSILON {
        return;
    }
    let flipped = area < 0.0;
    let owns = [
        is_top_left(&b, &c, flipped),
        is_top_left(&c, &a, flipped),
        is_top_left(&a, &b, flipped),
    ];

    let Resolution { width, height } = target.resolution;
    let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as u32;
    let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as u32;
    let max_x = (a.x.max(b.x).max(c.x).ceil().max(0.0) as u32).min(width);
    let max_y = (a.y.max(b.y).max(c.y).ceil().max(0.0) as u32).min(height);

    for py in min_y..max_y {
        for px in min_x..max_x {
            let (sx, sy) = (px as f32 + 0.5, py as f32 + 0.5);
            let w = [
                edge(&b, &c, sx, sy) / area,
                edge(&c, &a, sx, sy) / area,
                edge(&a, &b, sx, sy) / area,
            ];
            let covered = w
                .iter()
                .zip(owns)
                .all(|(&wi, owned)| wi > 0.0 || (wi == 0.0 && owned));
            if !covered {
                continue;
            }
            let [w0, w1, w2] = w;

            // Flat triangles keep their exact depth (far-plane geometry sits at 1.0).
            let z = if a.z == b.z && b.z == c.z {
                a.z
            } else {
                w0 * a.z + w1 * b.z + w2 * c.z
            };
            let uv = [
                w0 * a.uv[0] + w1 * b.uv[0] + w2 * c.uv[0],
                w0 * a.uv[1] + w1 * b.uv[1] + w2 * c.uv[1],
            ];
            let dir = a.dir * w0 + b.dir * w1 + c.dir * w2;

            let mut color = None;
            for s in 0..target.samples {
                let i = target.index(px, py, s);
                if let (Some(func), Some(depth_buf)) = (depth, target.depth.as_mut()) {
                    if !func.passes(z, depth_buf[i]) {
                        continue;
                    }
                    depth_buf[i] = z;
                }
                let c = *color.get_or_insert_with(|| shade(uv, dir));
                target.color[i] = c;
            }
        }
    }
}

/// Edge function of `p -> q` at `(sx, sy)`.
///
/// Always evaluated from the lexicographically smaller endpoint, so the two
/// triangles sharing an edge get exactly opposite values.
fn edge(p: &RasterVertex, q: &RasterVertex, sx: f32, sy: f32) -> f32 {
    if (p.x, p.y) <= (q.x, q.y) {
        (q.x - p.x) * (sy - p.y) - (q.y - p.y) * (sx - p.x)
    } else {
        -((p.x - q.x) * (sy - q.y) - (p.y - q.y) * (sx - q.x))
    }
}

/// Top-left fill rule: samples exactly on an edge belong to the triangle
/// only if the edge is a top or a left edge.
fn is_top_left(p: &RasterVertex, q: &RasterVertex, flipped: bool) -> bool {
    let (dx, dy) = if flipped {
        (p.x - q.x, p.y - q.y)
    } else {
        (q.x - p.x, q.y - p.y)
    };
    dy < 0.0 || (dy == 0.0 && dx > 0.0)
}

impl Display for SoftDevice {
    fn resolution(&self) -> Resolution {
        self.screen.resolution
    }

    fn swap_buffers(&mut self) {
        self.record(DeviceEvent::SwapBuffers);
        self.presented += 1;
        self.last_presented = Some(self.screen.resolved_pixels());
    }
}

impl GraphicsDevice for SoftDevice {
    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId, DeviceError> {
        if !desc.resolution.is_valid() || desc.samples == 0 {
            return Err(DeviceError::InvalidDescriptor {
                label: desc.label.clone(),
                details: format!("{:?} with {} samples", desc.resolution, desc.samples),
            });
        }
        if self.rejected_samples.contains(&desc.samples) {
            return Err(DeviceError::Allocation {
                label: desc.label.clone(),
                details: format!("{}x multisampling rejected", desc.samples),
            });
        }
        let id = self
            .targets
            .insert(SoftTarget::new(desc.resolution, desc.samples, desc.depth));
        self.record(DeviceEvent::CreateTarget(id));
        Ok(id)
    }

    fn destroy_target(&mut self, id: TargetId) {
        if self.targets.remove(id).is_none() {
            log::warn!("SoftDevice: destroy of unknown target {id:?}");
        }
        if self.bound == RenderTarget::Offscreen(id) {
            self.bound = RenderTarget::Screen;
        }
        self.units.retain(|_, s| *s != TextureSource::TargetColor(id));
        self.record(DeviceEvent::DestroyTarget(id));
    }

    fn bind_target(&mut self, target: RenderTarget) {
        if self.target(target).is_none() {
            log::warn!("SoftDevice: bind of unknown target {target:?}");
        }
        self.bound = target;
        self.record(DeviceEvent::BindTarget(target));
    }

    fn clear(&mut self, color: Color, clear_depth: bool) {
        let target = self.bound;
        if let Some(t) = self.target_mut(target) {
            t.color.fill(color.to_array());
            if clear_depth {
                if let Some(depth) = t.depth.as_mut() {
                    depth.fill(1.0);
                }
            }
        }
        self.record(DeviceEvent::Clear { target, color, depth: clear_depth });
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
        self.record(DeviceEvent::DepthTest(enabled));
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.depth_func = func;
        self.record(DeviceEvent::DepthFunc(func));
    }

    fn blit(&mut self, src: TargetId, dst: TargetId, region: Region) {
        self.record(DeviceEvent::Blit { src, dst, region });
        if src == dst {
            log::warn!("SoftDevice: blit source and destination are the same target");
            return;
        }
        let Some(source) = self.targets.get(src) else {
            log::warn!("SoftDevice: blit from unknown target {src:?}");
            return;
        };
        let Some(dest_res) = self.targets.get(dst).map(|t| t.resolution) else {
            log::warn!("SoftDevice: blit into unknown target {dst:?}");
            return;
        };

        let x_end = (region.x + region.width)
            .min(source.resolution.width)
            .min(dest_res.width);
        let y_end = (region.y + region.height)
            .min(source.resolution.height)
            .min(dest_res.height);

        let resolved: Vec<(u32, u32, [f32; 4])> = (region.y..y_end)
            .flat_map(|y| (region.x..x_end).map(move |x| (x, y)))
            .map(|(x, y)| (x, y, source.resolved(x, y)))
            .collect();

        if let Some(dest) = self.targets.get_mut(dst) {
            for (x, y, c) in resolved {
                for s in 0..dest.samples {
                    let i = dest.index(x, y, s);
                    dest.color[i] = c;
                }
            }
        }
    }

    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, DeviceError> {
        if self.rejected_programs.contains(desc.label) {
            return Err(DeviceError::Compilation {
                label: desc.label.to_string(),
                details: "rejected by SoftDevice".to_string(),
            });
        }
        if desc.vertex.trim().is_empty() || desc.fragment.trim().is_empty() {
            return Err(DeviceError::Compilation {
                label: desc.label.to_string(),
                details: "empty stage source".to_string(),
            });
        }
        let id = self.programs.insert(SoftProgram {
            label: desc.label.to_string(),
            layout: desc.uniforms.clone(),
            texture: desc.texture,
            values: HashMap::new(),
        });
        self.record(DeviceEvent::CreateProgram(id));
        Ok(id)
    }

    fn destroy_program(&mut self, id: ProgramId) {
        if self.programs.remove(id).is_none() {
            log::warn!("SoftDevice: destroy of unknown program {id:?}");
        }
        if self.active == Some(id) {
            self.active = None;
        }
        self.record(DeviceEvent::DestroyProgram(id));
    }

    fn use_program(&mut self, id: ProgramId) {
        if self.programs.contains_key(id) {
            self.active = Some(id);
        } else {
            log::warn!("SoftDevice: use of unknown program {id:?}");
        }
        self.record(DeviceEvent::UseProgram(id));
    }

    fn active_program(&self) -> Option<ProgramId> {
        self.active
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let Some(id) = self.active else {
            log::error!("SoftDevice: uniform '{name}' set with no active program");
            return;
        };
        self.record(DeviceEvent::Uniform { program: id, name: name.to_string(), value });

        let Some(program) = self.programs.get_mut(id) else { return };
        match program.layout.get(name) {
            Some(slot) if slot.ty == value.ty() => {
                program.values.insert(name.to_string(), value);
            }
            Some(slot) => log::warn!(
                "SoftDevice: uniform '{name}' on '{}' is {:?}, got {:?}",
                program.label,
                slot.ty,
                value.ty()
            ),
            None => log::warn!(
                "SoftDevice: program '{}' declares no uniform '{name}'",
                program.label
            ),
        }
    }

    fn create_mesh(&mut self, desc: &MeshDesc<'_>) -> Result<MeshId, DeviceError> {
        let per = desc.layout.floats_per_vertex();
        if per == 0 || desc.vertices.len() % per != 0 {
            return Err(DeviceError::InvalidDescriptor {
                label: desc.label.to_string(),
                details: format!("{} floats is not a multiple of {per}", desc.vertices.len()),
            });
        }
        let id = self.meshes.insert(SoftMesh {
            layout: desc.layout,
            vertices: desc.vertices.to_vec(),
        });
        self.record(DeviceEvent::CreateMesh(id));
        Ok(id)
    }

    fn destroy_mesh(&mut self, id: MeshId) {
        if self.meshes.remove(id).is_none() {
            log::warn!("SoftDevice: destroy of unknown mesh {id:?}");
        }
        self.record(DeviceEvent::DestroyMesh(id));
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId, DeviceError> {
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
        let texels = desc
            .pixels
            .chunks_exact(4)
            .map(|p| [p[0], p[1], p[2], p[3]].map(|c| c as f32 / 255.0))
            .collect();
        let id = self.textures.insert(SoftTexture {
            kind: desc.kind,
            width: desc.width,
            height: desc.height,
            texels,
        });
        self.record(DeviceEvent::CreateTexture(id));
        Ok(id)
    }

    fn destroy_texture(&mut self, id: TextureId) {
        if self.textures.remove(id).is_none() {
            log::warn!("SoftDevice: destroy of unknown texture {id:?}");
        }
        self.units.retain(|_, s| *s != TextureSource::Texture(id));
        self.record(DeviceEvent::DestroyTexture(id));
    }

    fn bind_texture(&mut self, unit: u32, source: TextureSource) {
        self.units.insert(unit, source);
        self.record(DeviceEvent::BindTexture { unit, source });
    }

    fn draw(&mut self, mesh: MeshId, vertices: Range<u32>) {
        self.record(DeviceEvent::Draw {
            target: self.bound,
            program: self.active,
            mesh,
            vertices: vertices.clone(),
            depth_func: self.depth_func,
        });

        let Some(program) = self.active.and_then(|id| self.programs.get(id)) else {
            log::warn!("SoftDevice: draw with no active program");
            return;
        };
        let Some(soft_mesh) = self.meshes.get(mesh) else {
            log::warn!("SoftDevice: draw of unknown mesh {mesh:?}");
            return;
        };
        let Some(resolution) = self.target(self.bound).map(|t| t.resolution) else {
            log::warn!("SoftDevice: draw into unknown target {:?}", self.bound);
            return;
        };

        let per = soft_mesh.layout.floats_per_vertex();
        let count = (soft_mesh.vertices.len() / per) as u32;
        let range = vertices.start.min(count)..vertices.end.min(count);

        let transformed: Vec<Option<RasterVertex>> = range
            .map(|i| {
                let start = i as usize * per;
                let vertex = &soft_mesh.vertices[start..start + per];
                Self::transform_vertex(&soft_mesh.layout, vertex, program, resolution)
            })
            .collect();

        let wanted = program.texture;
        let depth = self.depth_test.then_some(self.depth_func);
        let bound = self.bound;
        let Self { screen, targets, textures, units, .. } = self;
        let source = units.get(&0).copied();

        let (target, sampler) = match (bound, source) {
            (RenderTarget::Screen, source) => {
                let sampler = match source {
                    Some(TextureSource::Texture(id)) => textures.get(id).map(Sampler::Texture),
                    Some(TextureSource::TargetColor(id)) => targets.get(id).and_then(target_sampler),
                    None => None,
                };
                (screen, sampler)
            }
            (RenderTarget::Offscreen(dst), Some(TextureSource::TargetColor(src)))
                if src != dst && targets.contains_key(src) =>
            {
                let Some([target, read]) = targets.get_disjoint_mut([dst, src]) else {
                    log::warn!("SoftDevice: draw into unknown target {dst:?}");
                    return;
                };
                (target, target_sampler(read))
            }
            (RenderTarget::Offscreen(dst), source) => {
                if source == Some(TextureSource::TargetColor(dst)) {
                    log::warn!("SoftDevice: target {dst:?} sampled while bound for drawing");
                }
                let sampler = match source {
                    Some(TextureSource::Texture(id)) => textures.get(id).map(Sampler::Texture),
                    _ => None,
                };
                let Some(target) = targets.get_mut(dst) else { return };
                (target, sampler)
            }
        };

        let sampler = sampler.filter(|s| wanted == Some(s.kind()));
        let shade = move |uv: [f32; 2], dir: Vec3| sampler.map_or([1.0; 4], |s| s.sample(uv, dir));

        for tri in transformed.chunks_exact(3) {
            if let [Some(a), Some(b), Some(c)] = tri {
                rasterize(target, [*a, *b, *c], depth, &shade);
            }
        }
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
