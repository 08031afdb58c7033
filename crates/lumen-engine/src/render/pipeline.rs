use glam::{Mat3, Mat4};

use crate::gfx::{DepthFunc, GraphicsDevice, RenderTarget, Resolution, TextureSource};
use crate::scene::{SceneProvider, Skybox};

use super::{
    FrameStage, FrameTargets, PipelineConfig, ProgramKind, RenderError, RenderQueue, ScreenQuad,
    ShaderSet, StageTracker, build_render_queue,
};

/// What one [`RenderPipeline::render`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    /// Drawables drawn by the scene pass (skybox excluded).
    pub drawables: usize,
    /// Counter handed to the post-process program.
    pub time_offset: u32,
    /// Stages completed, in execution order.
    pub stages: Vec<FrameStage>,
}

/// Offscreen-then-composite frame pipeline.
///
/// Owns the frame targets, the shader set and the screen quad. The device and
/// the scene are borrowed per call; nothing from a scene outlives a frame.
///
/// Must be released with [`shut_down`](Self::shut_down); dropping it leaks
/// the GPU resources and logs a warning.
#[derive(Debug)]
pub struct RenderPipeline {
    config: PipelineConfig,
    targets: FrameTargets,
    shaders: ShaderSet,
    quad: ScreenQuad,
    tracker: StageTracker,
}

impl RenderPipeline {
    /// Allocates both frame targets at the display resolution, loads the
    /// shader set and builds the screen quad.
    ///
    /// On failure everything created so far is released again.
    pub fn start_up(
        device: &mut dyn GraphicsDevice,
        config: PipelineConfig,
    ) -> Result<Self, RenderError> {
        let resolution = device.resolution();
        log::info!(
            "starting render pipeline at {}x{} ({}x MSAA)",
            resolution.width,
            resolution.height,
            config.sample_count
        );

        let targets = FrameTargets::allocate(device, resolution, config.sample_count)?;

        let shaders = match ShaderSet::load(device, &config.shaders) {
            Ok(shaders) => shaders,
            Err(e) => {
                targets.release(device);
                return Err(e);
            }
        };

        let quad = match ScreenQuad::new(device) {
            Ok(quad) => quad,
            Err(e) => {
                shaders.release(device);
                targets.release(device);
                return Err(RenderError::QuadSetup(e));
            }
        };

        Ok(Self {
            config,
            targets,
            shaders,
            quad,
            tracker: StageTracker::new(),
        })
    }

    /// Releases every program, both targets and the quad mesh.
    pub fn shut_down(self, device: &mut dyn GraphicsDevice) {
        let frames = self.tracker.completed_frames();
        self.shaders.release(device);
        self.targets.release(device);
        self.quad.release(device);
        log::info!("render pipeline shut down after {frames} frames");
    }

    /// Reallocates both frame targets at `resolution`.
    ///
    /// The current targets stay in place if the new pair cannot be allocated.
    pub fn resize(
        &mut self,
        device: &mut dyn GraphicsDevice,
        resolution: Resolution,
    ) -> Result<(), RenderError> {
        if resolution == self.targets.resolution() {
            return Ok(());
        }
        let fresh = FrameTargets::allocate(device, resolution, self.config.sample_count)?;
        let old = std::mem::replace(&mut self.targets, fresh);
        old.release(device);
        log::debug!("frame targets resized to {}x{}", resolution.width, resolution.height);
        Ok(())
    }

    /// Runs one frame: every stage of [`FrameStage::ORDER`] in sequence.
    ///
    /// `time_offset` is the caller's millisecond counter, forwarded to the
    /// post-process program.
    pub fn render(
        &mut self,
        device: &mut dyn GraphicsDevice,
        scenes: &dyn SceneProvider,
        time_offset: u32,
    ) -> Result<FrameReport, RenderError> {
        let mut stages = Vec::with_capacity(FrameStage::ORDER.len());

        self.bind_offscreen(device)?;
        stages.push(FrameStage::BindOffscreen);

        let mut queue = self.build_queue(scenes)?;
        stages.push(FrameStage::BuildQueue);

        let drawables = self.draw_scene(device, &mut queue)?;
        stages.push(FrameStage::DrawScene);

        self.resolve(device)?;
        stages.push(FrameStage::Resolve);

        self.bind_screen(device)?;
        stages.push(FrameStage::BindScreen);

        self.post_process(device, time_offset)?;
        stages.push(FrameStage::PostProcess);

        self.present(device)?;
        stages.push(FrameStage::Present);

        self.release_frame(queue)?;
        stages.push(FrameStage::ReleaseFrame);

        log::trace!("frame {} done: {drawables} drawables", self.tracker.completed_frames());
        Ok(FrameReport {
            drawables,
            time_offset,
            stages,
        })
    }

    /// Binds the multisampled target, clears color and depth and enables
    /// depth testing with `Less`.
    pub fn bind_offscreen(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), RenderError> {
        self.tracker.enter(FrameStage::BindOffscreen)?;
        device.bind_target(self.targets.multisampled.as_render_target());
        device.clear(self.config.clear_color, true);
        device.set_depth_test(true);
        device.set_depth_func(DepthFunc::Less);
        Ok(())
    }

    pub fn build_queue<'s>(
        &mut self,
        scenes: &'s dyn SceneProvider,
    ) -> Result<RenderQueue<'s>, RenderError> {
        self.tracker.enter(FrameStage::BuildQueue)?;
        build_render_queue(scenes)
    }

    /// Draws every queued drawable with the Main program, then the skybox.
    /// Returns the number of drawables drawn; the queue is left empty.
    pub fn draw_scene(
        &mut self,
        device: &mut dyn GraphicsDevice,
        queue: &mut RenderQueue<'_>,
    ) -> Result<usize, RenderError> {
        self.tracker.enter(FrameStage::DrawScene)?;

        let view = queue.camera.view_matrix();
        let projection = queue.camera.projection_matrix();
        let view_projection = projection * view;
        let eye = queue.camera.position();

        let main = self.shaders[ProgramKind::Main];
        main.activate(device);
        self.config.lighting.apply(device, &main);

        let mut drawn = 0;
        while let Some(drawable) = queue.drawables.pop() {
            let model = drawable.model_matrix();
            main.set_mat4(device, "MVP", view_projection * model);
            main.set_mat4(device, "M", model);
            main.set_vec3(device, "cameraPos_wS", eye);
            drawable.draw(device, &main);
            drawn += 1;
        }

        self.draw_skybox(device, queue.skybox, skybox_view_projection(view, projection));
        Ok(drawn)
    }

    fn draw_skybox(&self, device: &mut dyn GraphicsDevice, skybox: &dyn Skybox, vp: Mat4) {
        device.set_depth_func(DepthFunc::LessEqual);
        let program = self.shaders[ProgramKind::Skybox];
        program.activate(device);
        program.set_mat4(device, "VP", vp);
        skybox.draw(device);
        device.set_depth_func(DepthFunc::Less);
    }

    /// Resolves the multisampled target into the resolve target.
    pub fn resolve(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), RenderError> {
        self.tracker.enter(FrameStage::Resolve)?;
        self.targets.resolve(device);
        Ok(())
    }

    /// Binds the screen and clears its color.
    pub fn bind_screen(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), RenderError> {
        self.tracker.enter(FrameStage::BindScreen)?;
        device.bind_target(RenderTarget::Screen);
        device.clear(self.config.clear_color, false);
        Ok(())
    }

    /// Draws the screen quad with the Screen program sampling the resolve
    /// target from unit 0.
    pub fn post_process(
        &mut self,
        device: &mut dyn GraphicsDevice,
        time_offset: u32,
    ) -> Result<(), RenderError> {
        self.tracker.enter(FrameStage::PostProcess)?;
        device.set_depth_test(false);

        let screen = self.shaders[ProgramKind::Screen];
        screen.activate(device);
        screen.set_int(device, "offset", offset_uniform(time_offset));
        device.bind_texture(0, TextureSource::TargetColor(self.targets.resolve.id()));
        self.quad.draw(device);
        Ok(())
    }

    pub fn present(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), RenderError> {
        self.tracker.enter(FrameStage::Present)?;
        device.swap_buffers();
        Ok(())
    }

    /// Ends the frame, giving back everything borrowed from the scene.
    pub fn release_frame(&mut self, queue: RenderQueue<'_>) -> Result<(), RenderError> {
        self.tracker.enter(FrameStage::ReleaseFrame)?;
        if !queue.drawables.is_empty() {
            log::warn!("{} drawables were never drawn this frame", queue.drawables.len());
        }
        Ok(())
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[inline]
    pub fn targets(&self) -> &FrameTargets {
        &self.targets
    }

    #[inline]
    pub fn shaders(&self) -> &ShaderSet {
        &self.shaders
    }

    #[inline]
    pub fn quad(&self) -> &ScreenQuad {
        &self.quad
    }

    #[inline]
    pub fn tracker(&self) -> &StageTracker {
        &self.tracker
    }
}

/// Projection times the rotation part of `view`; the skybox stays centered
/// on the eye.
pub fn skybox_view_projection(view: Mat4, projection: Mat4) -> Mat4 {
    projection * Mat4::from_mat3(Mat3::from_mat4(view))
}

/// Counters past `i32::MAX` saturate instead of wrapping negative.
#[inline]
fn offset_uniform(time_offset: u32) -> i32 {
    i32::try_from(time_offset).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_saturates() {
        assert_eq!(offset_uniform(1500), 1500);
        assert_eq!(offset_uniform(u32::MAX), i32::MAX);
    }
}
