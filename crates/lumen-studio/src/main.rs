//! Lumen Studio: a lit, spinning scene rendered through the frame pipeline.

mod geometry;
mod model;
mod scene;
mod skybox;

use anyhow::{Context, Result};
use lumen_engine::core::{App, AppControl, FrameCtx};
use lumen_engine::device::GpuInit;
use lumen_engine::gfx::{Display, GraphicsDevice, WgpuDevice};
use lumen_engine::logging::{LoggingConfig, init_logging};
use lumen_engine::render::{PipelineConfig, RenderPipeline};
use lumen_engine::window::{Runtime, RuntimeConfig};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use crate::scene::DemoScene;

/// Frames between window title refreshes.
const TITLE_INTERVAL: u64 = 120;

struct Studio {
    title: String,
    pipeline_config: PipelineConfig,
    state: Option<StudioState>,
    frame_seconds: f32,
}

struct StudioState {
    pipeline: RenderPipeline,
    scene: DemoScene,
}

impl StudioState {
    fn create(device: &mut dyn GraphicsDevice, config: PipelineConfig) -> Result<Self> {
        let pipeline =
            RenderPipeline::start_up(device, config).context("failed to start the render pipeline")?;
        let scene = match DemoScene::new(device) {
            Ok(scene) => scene,
            Err(e) => {
                pipeline.shut_down(device);
                return Err(e);
            }
        };
        Ok(Self { pipeline, scene })
    }

    fn release(self, device: &mut dyn GraphicsDevice) {
        self.scene.release(device);
        self.pipeline.shut_down(device);
    }
}

impl Studio {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            pipeline_config: PipelineConfig::default(),
            state: None,
            frame_seconds: 0.0,
        }
    }
}

impl App for Studio {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => AppControl::Exit,
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let state = match self.state.take() {
            Some(state) => state,
            None => match StudioState::create(ctx.device, self.pipeline_config.clone()) {
                Ok(state) => state,
                Err(e) => {
                    log::error!("{e:#}");
                    return AppControl::Exit;
                }
            },
        };
        let state = self.state.insert(state);

        let resolution = ctx.device.resolution();
        if !resolution.is_valid() {
            // Minimized.
            return AppControl::Continue;
        }
        if resolution != state.pipeline.targets().resolution() {
            if let Err(e) = state.pipeline.resize(ctx.device, resolution) {
                log::warn!("keeping old frame targets: {e}");
            }
        }

        let seconds = ctx.time.elapsed_ms as f32 / 1000.0;
        state.scene.update(seconds, resolution.aspect());

        ctx.pre_present_notify();
        match state.pipeline.render(ctx.device, &state.scene, ctx.time.elapsed_ms) {
            Ok(report) => log::trace!("frame {}: {report:?}", ctx.time.frame_index),
            Err(e) => log::warn!("frame {} dropped: {e}", ctx.time.frame_index),
        }

        if ctx.device.surface_lost() {
            log::error!("window surface lost");
            return AppControl::Exit;
        }

        self.frame_seconds += ctx.time.dt;
        if ctx.time.frame_index % TITLE_INTERVAL == TITLE_INTERVAL - 1 {
            let fps = TITLE_INTERVAL as f32 / self.frame_seconds.max(f32::EPSILON);
            ctx.window.set_title(&format!("{} ({fps:.0} fps)", self.title));
            self.frame_seconds = 0.0;
        }

        AppControl::Continue
    }

    fn on_shutdown(&mut self, _window_id: WindowId, device: &mut WgpuDevice<'_>) {
        if let Some(state) = self.state.take() {
            state.release(device);
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let title = "Lumen Studio";
    let config = RuntimeConfig {
        title: title.to_string(),
        ..RuntimeConfig::default()
    };
    Runtime::run(config, GpuInit::default(), Studio::new(title))
}
