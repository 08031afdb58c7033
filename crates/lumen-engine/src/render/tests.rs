//! Whole-frame scenarios on the software device with hand-built scenes.

use approx::assert_relative_eq;
use glam::{Mat4, Vec3};

use super::*;
use crate::gfx::{
    DepthFunc, DeviceEvent, GraphicsDevice, MeshDesc, MeshId, ProgramId, RenderTarget,
    Resolution, SoftDevice, TextureDesc, TextureId, TextureKind, TextureSource, UniformValue,
};
use crate::scene::{Camera, Drawable, DrawableQueue, PerspectiveCamera, Scene, SceneProvider, Skybox};

const RES: Resolution = Resolution::new(8, 8);
const RED: [u8; 4] = [255, 0, 0, 255];
const SKY: [u8; 4] = [0, 0, 255, 255];
const SKY_F: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
const RED_F: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const WHITE_F: [f32; 4] = [1.0; 4];

#[derive(Debug, Copy, Clone)]
struct Panel {
    model: Mat4,
    mesh: MeshId,
    texture: TextureId,
}

impl Drawable for Panel {
    fn model_matrix(&self) -> Mat4 {
        self.model
    }

    fn draw(&self, device: &mut dyn GraphicsDevice, _program: &ShaderProgram) {
        device.bind_texture(0, TextureSource::Texture(self.texture));
        device.draw(self.mesh, 0..6);
    }
}

/// Only the -Z face of the cube; enough to fill a forward-looking view.
#[derive(Debug, Copy, Clone)]
struct FrontSky {
    mesh: MeshId,
    cube: TextureId,
}

impl Skybox for FrontSky {
    fn draw(&self, device: &mut dyn GraphicsDevice) {
        device.bind_texture(0, TextureSource::Texture(self.cube));
        device.draw(self.mesh, 0..6);
    }
}

struct TestScene {
    camera: Option<PerspectiveCamera>,
    sky: Option<FrontSky>,
    panels: Vec<Panel>,
}

impl Scene for TestScene {
    fn camera(&self) -> Option<&dyn Camera> {
        self.camera.as_ref().map(|c| c as &dyn Camera)
    }

    fn skybox(&self) -> Option<&dyn Skybox> {
        self.sky.as_ref().map(|s| s as &dyn Skybox)
    }

    fn visible_drawables(&self) -> DrawableQueue<'_> {
        self.panels.iter().map(|p| p as &dyn Drawable).collect()
    }
}

struct Provider(Option<TestScene>);

impl SceneProvider for Provider {
    fn current_scene(&self) -> Option<&dyn Scene> {
        self.0.as_ref().map(|s| s as &dyn Scene)
    }
}

struct Fixture {
    dev: SoftDevice,
    panel_mesh: MeshId,
    red: TextureId,
    sky: FrontSky,
}

impl Fixture {
    fn new() -> Self {
        let mut dev = SoftDevice::new(RES);

        #[rustfmt::skip]
        let panel = [
            MeshVertex::new([-1.0, -1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            MeshVertex::new([ 1.0, -1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            MeshVertex::new([ 1.0,  1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            MeshVertex::new([-1.0, -1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            MeshVertex::new([ 1.0,  1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            MeshVertex::new([-1.0,  1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        let panel_mesh = dev
            .create_mesh(&MeshDesc {
                label: "panel",
                vertices: bytemuck::cast_slice(&panel),
                layout: MeshVertex::LAYOUT,
            })
            .unwrap();

        #[rustfmt::skip]
        let face = [
            SkyVertex { position: [-1.0, -1.0, -1.0] },
            SkyVertex { position: [ 1.0, -1.0, -1.0] },
            SkyVertex { position: [ 1.0,  1.0, -1.0] },
            SkyVertex { position: [-1.0, -1.0, -1.0] },
            SkyVertex { position: [ 1.0,  1.0, -1.0] },
            SkyVertex { position: [-1.0,  1.0, -1.0] },
        ];
        let sky_mesh = dev
            .create_mesh(&MeshDesc {
                label: "sky face",
                vertices: bytemuck::cast_slice(&face),
                layout: SkyVertex::LAYOUT,
            })
            .unwrap();

        let red = solid_texture(&mut dev, TextureKind::D2, RED);
        let cube = solid_texture(&mut dev, TextureKind::Cube, SKY);

        Self {
            dev,
            panel_mesh,
            red,
            sky: FrontSky { mesh: sky_mesh, cube },
        }
    }

    /// `count` red panels straight ahead, each one unit further away.
    fn scene(&self, fov_degrees: f32, count: usize) -> Provider {
        let panels = (0..count)
            .map(|i| Panel {
                model: Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0 - i as f32)),
                mesh: self.panel_mesh,
                texture: self.red,
            })
            .collect();
        Provider(Some(TestScene {
            camera: Some(forward_camera(fov_degrees)),
            sky: Some(self.sky),
            panels,
        }))
    }

    fn start(&mut self, sample_count: u32) -> RenderPipeline {
        let config = PipelineConfig {
            sample_count,
            ..PipelineConfig::default()
        };
        RenderPipeline::start_up(&mut self.dev, config).unwrap()
    }
}

fn solid_texture(dev: &mut SoftDevice, kind: TextureKind, rgba: [u8; 4]) -> TextureId {
    let pixels = rgba.repeat(kind.layers() as usize);
    dev.create_texture(&TextureDesc {
        label: "solid",
        kind,
        width: 1,
        height: 1,
        pixels: &pixels,
    })
    .unwrap()
}

fn forward_camera(fov_degrees: f32) -> PerspectiveCamera {
    PerspectiveCamera {
        position: Vec3::ZERO,
        target: Vec3::NEG_Z,
        up: Vec3::Y,
        fov_y: fov_degrees.to_radians(),
        aspect: 1.0,
        near: 0.1,
        far: 100.0,
    }
}

fn program(pipeline: &RenderPipeline, kind: ProgramKind) -> ProgramId {
    pipeline.shaders()[kind].id()
}

fn uniform_names(dev: &SoftDevice, program: ProgramId) -> Vec<String> {
    dev.events()
        .iter()
        .filter_map(|e| match e {
            DeviceEvent::Uniform { program: p, name, .. } if *p == program => Some(name.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn empty_scene_completes_every_stage_and_shows_sky_over_background() {
    let mut fx = Fixture::new();
    let mut pipeline = fx.start(4);
    // A wide lens leaves the sky face smaller than the view.
    let scenes = fx.scene(120.0, 0);

    let report = pipeline.render(&mut fx.dev, &scenes, 0).unwrap();

    assert_eq!(report.stages, FrameStage::ORDER.to_vec());
    assert_eq!(report.drawables, 0);
    assert_eq!(fx.dev.presented_frames(), 1);
    assert_eq!(pipeline.tracker().completed_frames(), 1);

    let frame = fx.dev.last_presented().unwrap();
    assert_eq!(frame[(4 * RES.width + 4) as usize], SKY_F);
    assert_eq!(frame[0], WHITE_F);

    pipeline.shut_down(&mut fx.dev);
}

#[test]
fn scene_pass_drains_the_queue() {
    let mut fx = Fixture::new();
    let mut pipeline = fx.start(4);
    let scenes = fx.scene(60.0, 3);

    pipeline.bind_offscreen(&mut fx.dev).unwrap();
    let mut queue = pipeline.build_queue(&scenes).unwrap();
    assert_eq!(queue.drawables.len(), 3);

    let drawn = pipeline.draw_scene(&mut fx.dev, &mut queue).unwrap();
    assert_eq!(drawn, 3);
    assert!(queue.drawables.is_empty());

    pipeline.shut_down(&mut fx.dev);
}

#[test]
fn lights_are_pushed_once_per_scene_draw() {
    let mut fx = Fixture::new();
    let mut pipeline = fx.start(4);
    let scenes = fx.scene(60.0, 2);
    fx.dev.clear_events();

    pipeline.render(&mut fx.dev, &scenes, 0).unwrap();

    let names = uniform_names(&fx.dev, program(&pipeline, ProgramKind::Main));
    let point: Vec<&String> = names.iter().filter(|n| n.starts_with("pointLights[")).collect();
    assert_eq!(point.len(), POINT_LIGHT_COUNT * POINT_LIGHT_UNIFORMS);
    for i in 0..POINT_LIGHT_COUNT {
        let prefix = format!("pointLights[{i}].");
        assert_eq!(
            point.iter().filter(|n| n.starts_with(&prefix)).count(),
            POINT_LIGHT_UNIFORMS
        );
    }
    assert_eq!(names.iter().filter(|n| n.starts_with("dirLight.")).count(), 4);

    let main = program(&pipeline, ProgramKind::Main);
    assert_eq!(
        fx.dev.uniform(main, &point_light_uniform(2, "position")),
        Some(UniformValue::Vec3(Vec3::new(400.0, 400.0, 200.0)))
    );

    pipeline.shut_down(&mut fx.dev);
}

#[test]
fn each_drawable_gets_its_matrices_then_one_skybox_draw() {
    let mut fx = Fixture::new();
    let mut pipeline = fx.start(4);
    let scenes = fx.scene(60.0, 3);
    fx.dev.clear_events();

    pipeline.render(&mut fx.dev, &scenes, 0).unwrap();

    let main = program(&pipeline, ProgramKind::Main);
    let skybox = program(&pipeline, ProgramKind::Skybox);
    let trace: Vec<String> = fx
        .dev
        .events()
        .iter()
        .filter_map(|e| match e {
            DeviceEvent::Uniform { program, name, .. }
                if *program == main && !name.contains("Light") =>
            {
                Some(name.clone())
            }
            DeviceEvent::Draw { program: Some(p), .. } if *p == main => Some("draw".into()),
            DeviceEvent::Draw { program: Some(p), .. } if *p == skybox => Some("sky".into()),
            _ => None,
        })
        .collect();

    let mut expected: Vec<&str> = ["MVP", "M", "cameraPos_wS", "draw"].repeat(3);
    expected.push("sky");
    assert_eq!(trace, expected);

    // The last panel pushed its own MVP.
    let camera = forward_camera(60.0);
    let model = Mat4::from_translation(Vec3::new(0.0, 0.0, -7.0));
    let Some(UniformValue::Mat4(mvp)) = fx.dev.uniform(main, "MVP") else {
        panic!("MVP was never set");
    };
    let want = camera.projection_matrix() * camera.view_matrix() * model;
    for (got, want) in mvp.to_cols_array().iter().zip(want.to_cols_array()) {
        assert_relative_eq!(*got, want, epsilon = 1e-5);
    }

    pipeline.shut_down(&mut fx.dev);
}

#[test]
fn skybox_draws_with_less_equal_and_restores_less() {
    let mut fx = Fixture::new();
    let mut pipeline = fx.start(4);
    let scenes = fx.scene(60.0, 1);
    fx.dev.clear_events();

    pipeline.bind_offscreen(&mut fx.dev).unwrap();
    let mut queue = pipeline.build_queue(&scenes).unwrap();
    pipeline.draw_scene(&mut fx.dev, &mut queue).unwrap();

    let main = program(&pipeline, ProgramKind::Main);
    let skybox = program(&pipeline, ProgramKind::Skybox);
    for event in fx.dev.events() {
        if let DeviceEvent::Draw { program: Some(p), depth_func, .. } = event {
            let want = if *p == skybox { DepthFunc::LessEqual } else { DepthFunc::Less };
            assert_eq!(*depth_func, want, "draw with {p:?} (main is {main:?})");
        }
    }
    assert_eq!(fx.dev.depth_state(), (true, DepthFunc::Less));

    pipeline.shut_down(&mut fx.dev);
}

#[test]
fn skybox_view_projection_ignores_camera_translation() {
    let near = forward_camera(60.0);
    let mut far = near;
    far.position = Vec3::new(50.0, -3.0, 12.0);
    far.target = far.position + Vec3::NEG_Z;

    let a = skybox_view_projection(near.view_matrix(), near.projection_matrix());
    let b = skybox_view_projection(far.view_matrix(), far.projection_matrix());
    for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array()) {
        assert_relative_eq!(*x, y, epsilon = 1e-5);
    }

    // Rotation still matters.
    let mut turned = near;
    turned.target = Vec3::X;
    let c = skybox_view_projection(turned.view_matrix(), turned.projection_matrix());
    assert!(!a.abs_diff_eq(c, 1e-3));
}

#[test]
fn resolve_preserves_a_solid_scene() {
    for samples in [1, 4] {
        let mut fx = Fixture::new();
        let mut pipeline = fx.start(samples);
        let scenes = fx.scene(60.0, 0);

        pipeline.render(&mut fx.dev, &scenes, 0).unwrap();

        let resolve = pipeline.targets().resolve.as_render_target();
        let pixels = fx.dev.read_target(resolve).unwrap();
        assert_eq!(pixels.len(), RES.pixel_count());
        assert!(pixels.iter().all(|p| *p == SKY_F), "{samples} samples");
        assert!(fx.dev.last_presented().unwrap().iter().all(|p| *p == SKY_F));

        pipeline.shut_down(&mut fx.dev);
    }
}

#[test]
fn resolve_step_averages_a_prefilled_target_outside_a_frame() {
    let mut fx = Fixture::new();
    let pipeline = fx.start(4);
    let ms = pipeline.targets().multisampled.id();

    for y in 0..RES.height {
        for x in 0..RES.width {
            assert!(fx.dev.write_sample(ms, x, y, 0, RED_F));
            for s in 1..4 {
                assert!(fx.dev.write_sample(ms, x, y, s, SKY_F));
            }
        }
    }
    pipeline.targets().resolve(&mut fx.dev);

    let resolve = pipeline.targets().resolve.as_render_target();
    let pixels = fx.dev.read_target(resolve).unwrap();
    assert!(pixels.iter().all(|p| *p == [0.25, 0.0, 0.75, 1.0]));
    assert_eq!(pipeline.tracker().current(), None);

    pipeline.shut_down(&mut fx.dev);
}

#[test]
fn drawables_occlude_the_skybox() {
    let mut fx = Fixture::new();
    let mut pipeline = fx.start(4);
    let scenes = fx.scene(60.0, 1);

    pipeline.render(&mut fx.dev, &scenes, 0).unwrap();

    let frame = fx.dev.last_presented().unwrap();
    assert_eq!(frame[(4 * RES.width + 4) as usize], RED_F);
    assert_eq!(frame[0], SKY_F);

    pipeline.shut_down(&mut fx.dev);
}

#[test]
fn post_process_samples_the_resolve_target_on_screen() {
    let mut fx = Fixture::new();
    let mut pipeline = fx.start(4);
    let scenes = fx.scene(60.0, 1);
    fx.dev.clear_events();

    pipeline.render(&mut fx.dev, &scenes, 1234).unwrap();

    let screen = program(&pipeline, ProgramKind::Screen);
    let resolve = pipeline.targets().resolve.id();
    let events = fx.dev.events();
    let bind_screen = events
        .iter()
        .position(|e| *e == DeviceEvent::BindTarget(RenderTarget::Screen))
        .unwrap();
    let tail = &events[bind_screen..];

    assert!(tail.contains(&DeviceEvent::DepthTest(false)));
    assert!(tail.contains(&DeviceEvent::BindTexture {
        unit: 0,
        source: TextureSource::TargetColor(resolve),
    }));
    assert!(tail.contains(&DeviceEvent::Draw {
        target: RenderTarget::Screen,
        program: Some(screen),
        mesh: pipeline.quad().mesh(),
        vertices: 0..ScreenQuad::VERTEX_COUNT,
        depth_func: DepthFunc::Less,
    }));
    assert_eq!(tail.last(), Some(&DeviceEvent::SwapBuffers));
    assert_eq!(fx.dev.uniform(screen, "offset"), Some(UniformValue::Int(1234)));

    pipeline.shut_down(&mut fx.dev);
}

#[test]
fn post_process_is_repeatable() {
    let mut fx = Fixture::new();
    let mut pipeline = fx.start(4);
    let scenes = fx.scene(60.0, 2);

    pipeline.render(&mut fx.dev, &scenes, 777).unwrap();
    let first = fx.dev.last_presented().unwrap().to_vec();
    pipeline.render(&mut fx.dev, &scenes, 777).unwrap();

    assert_eq!(fx.dev.last_presented().unwrap(), first.as_slice());
    assert_eq!(pipeline.tracker().completed_frames(), 2);

    pipeline.shut_down(&mut fx.dev);
}

#[test]
fn huge_time_offset_saturates() {
    let mut fx = Fixture::new();
    let mut pipeline = fx.start(1);
    let scenes = fx.scene(60.0, 0);

    let report = pipeline.render(&mut fx.dev, &scenes, u32::MAX).unwrap();
    assert_eq!(report.time_offset, u32::MAX);
    let screen = program(&pipeline, ProgramKind::Screen);
    assert_eq!(fx.dev.uniform(screen, "offset"), Some(UniformValue::Int(i32::MAX)));

    pipeline.shut_down(&mut fx.dev);
}

#[test]
fn failed_startup_leaves_nothing_alive() {
    for kind in ProgramKind::ALL {
        let mut dev = SoftDevice::new(RES);
        dev.reject_program(kind.label());
        let err = RenderPipeline::start_up(&mut dev, PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, RenderError::ShaderLoad { kind: k, .. } if k == kind));
        assert_eq!(dev.live_resources().total(), 0, "{kind} rejected");
    }

    let mut dev = SoftDevice::new(RES);
    dev.reject_targets_with_samples(1);
    let err = RenderPipeline::start_up(&mut dev, PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, RenderError::TargetAllocation { which: "resolve", .. }));
    assert_eq!(dev.live_resources().total(), 0);
}

#[test]
fn zero_sized_display_fails_startup() {
    let mut dev = SoftDevice::new(Resolution::new(0, 0));
    let err = RenderPipeline::start_up(&mut dev, PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, RenderError::InvalidResolution(_)));
    assert_eq!(dev.live_resources().total(), 0);
}

#[test]
fn shutdown_releases_every_pipeline_resource() {
    let mut fx = Fixture::new();
    let assets = fx.dev.live_resources();
    let mut pipeline = fx.start(4);
    let live = fx.dev.live_resources();
    assert_eq!(live.targets, 2);
    assert_eq!(live.programs, 3);
    assert_eq!(live.meshes, assets.meshes + 1);

    let scenes = fx.scene(60.0, 1);
    pipeline.render(&mut fx.dev, &scenes, 0).unwrap();
    pipeline.shut_down(&mut fx.dev);

    assert_eq!(fx.dev.live_resources(), assets);
}

#[test]
fn missing_scene_parts_fail_fast() {
    let mut fx = Fixture::new();
    let mut pipeline = fx.start(4);

    let err = pipeline.render(&mut fx.dev, &Provider(None), 0).unwrap_err();
    assert!(matches!(err, RenderError::NoActiveScene));

    let mut no_camera = fx.scene(60.0, 1);
    if let Some(scene) = no_camera.0.as_mut() {
        scene.camera = None;
    }
    let err = pipeline.render(&mut fx.dev, &no_camera, 0).unwrap_err();
    assert!(matches!(err, RenderError::MissingCamera));

    let mut no_sky = fx.scene(60.0, 1);
    if let Some(scene) = no_sky.0.as_mut() {
        scene.sky = None;
    }
    let err = pipeline.render(&mut fx.dev, &no_sky, 0).unwrap_err();
    assert!(matches!(err, RenderError::MissingSkybox));
    assert_eq!(fx.dev.presented_frames(), 0);

    // The next complete scene renders normally.
    let scenes = fx.scene(60.0, 1);
    pipeline.render(&mut fx.dev, &scenes, 0).unwrap();
    assert_eq!(fx.dev.presented_frames(), 1);

    pipeline.shut_down(&mut fx.dev);
}

#[test]
fn stages_out_of_order_are_rejected() {
    let mut fx = Fixture::new();
    let mut pipeline = fx.start(4);

    let err = pipeline.resolve(&mut fx.dev).unwrap_err();
    assert!(matches!(
        err,
        RenderError::StageOrder {
            expected: FrameStage::BindOffscreen,
            found: FrameStage::Resolve,
        }
    ));

    pipeline.bind_offscreen(&mut fx.dev).unwrap();
    assert!(pipeline.present(&mut fx.dev).is_err());
    assert_eq!(fx.dev.presented_frames(), 0);

    pipeline.shut_down(&mut fx.dev);
}

#[test]
fn resize_reallocates_both_targets() {
    let mut fx = Fixture::new();
    let mut pipeline = fx.start(4);

    let bigger = Resolution::new(16, 12);
    fx.dev.resize_display(bigger);
    pipeline.resize(&mut fx.dev, bigger).unwrap();
    assert_eq!(pipeline.targets().resolution(), bigger);
    assert_eq!(pipeline.targets().resolve.resolution(), bigger);
    assert_eq!(fx.dev.live_resources().targets, 2);

    let err = pipeline.resize(&mut fx.dev, Resolution::new(0, 12)).unwrap_err();
    assert!(matches!(err, RenderError::InvalidResolution(_)));
    assert_eq!(pipeline.targets().resolution(), bigger);

    let scenes = fx.scene(60.0, 0);
    pipeline.render(&mut fx.dev, &scenes, 0).unwrap();
    assert_eq!(fx.dev.last_presented().unwrap().len(), bigger.pixel_count());

    pipeline.shut_down(&mut fx.dev);
    assert_eq!(fx.dev.live_resources().targets, 0);
}
