use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::gfx::WgpuDevice;

use super::ctx::FrameCtx;

/// What the runtime should do after a callback.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application driven by [`Runtime`](crate::window::Runtime).
pub trait App {
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called once per redraw of each window.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called with the window's device right before the window and its
    /// surface are destroyed. GPU resources owned by the app are released here.
    fn on_shutdown(&mut self, window_id: WindowId, device: &mut WgpuDevice<'_>) {
        let _ = (window_id, device);
    }
}
