use crate::scene::{Camera, DrawableQueue, SceneProvider, Skybox};

use super::RenderError;

/// Everything the scene pass borrows from the current scene for one frame.
pub struct RenderQueue<'s> {
    pub camera: &'s dyn Camera,
    pub skybox: &'s dyn Skybox,
    pub drawables: DrawableQueue<'s>,
}

impl std::fmt::Debug for RenderQueue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderQueue")
            .field("drawables", &self.drawables.len())
            .finish_non_exhaustive()
    }
}

/// Pulls camera, skybox and visible drawables from the provider's current scene.
pub fn build_render_queue(provider: &dyn SceneProvider) -> Result<RenderQueue<'_>, RenderError> {
    let scene = provider.current_scene().ok_or(RenderError::NoActiveScene)?;
    let camera = scene.camera().ok_or(RenderError::MissingCamera)?;
    let skybox = scene.skybox().ok_or(RenderError::MissingSkybox)?;
    let drawables = scene.visible_drawables();
    log::trace!("render queue: {} drawables", drawables.len());

    Ok(RenderQueue {
        camera,
        skybox,
        drawables,
    })
}
