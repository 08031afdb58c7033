//! Contracts between the frame pipeline and the scene layer.
//!
//! The scene layer owns cameras, skyboxes and models and decides what is
//! visible. The pipeline only borrows them for the duration of one frame:
//! - [`SceneProvider`] locates the scene that is current this frame
//! - [`Scene`] exposes its camera, skybox and a fresh [`DrawableQueue`]
//! - [`Drawable`] and [`Skybox`] issue their own draw calls

mod camera;
mod queue;

pub use camera::PerspectiveCamera;
pub use queue::DrawableQueue;

use glam::{Mat4, Vec3};

use crate::gfx::GraphicsDevice;
use crate::render::ShaderProgram;

/// View/projection source for one frame.
pub trait Camera {
    fn view_matrix(&self) -> Mat4;
    fn projection_matrix(&self) -> Mat4;
    /// World-space eye position.
    fn position(&self) -> Vec3;
}

/// A scene object that binds its own geometry and material.
pub trait Drawable {
    /// Object-to-world transform.
    fn model_matrix(&self) -> Mat4;

    /// Issues draw calls with `program` already active and its per-object
    /// matrices set. May set additional material uniforms on `program`.
    fn draw(&self, device: &mut dyn GraphicsDevice, program: &ShaderProgram);
}

/// Cube-mapped background.
///
/// Called with the skybox program active and `VP` set; binds its cube map to
/// unit 0 and draws a unit cube.
pub trait Skybox {
    fn draw(&self, device: &mut dyn GraphicsDevice);
}

pub trait Scene {
    fn camera(&self) -> Option<&dyn Camera>;
    fn skybox(&self) -> Option<&dyn Skybox>;

    /// Visible drawables in submission order. Built fresh on every call.
    fn visible_drawables(&self) -> DrawableQueue<'_>;
}

/// Locates the active scene. Queried once per frame so scene switches take
/// effect on the next frame.
pub trait SceneProvider {
    fn current_scene(&self) -> Option<&dyn Scene>;
}
