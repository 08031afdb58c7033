use winit::window::{Window, WindowId};

use crate::gfx::WgpuDevice;
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

/// The window a frame is being rendered for.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }
}

/// Per-frame context handed to [`App::on_frame`](super::App::on_frame).
///
/// `'a` is the callback, `'w` the window borrow held by the device.
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub device: &'a mut WgpuDevice<'w>,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl FrameCtx<'_, '_> {
    /// Lets the compositor know a present is imminent. Call right before
    /// the frame's final `swap_buffers`.
    pub fn pre_present_notify(&self) {
        self.window.window.pre_present_notify();
    }
}
