/// An acquired swapchain image.
///
/// Holding it blocks acquisition of the next one; present or drop it before the
/// next frame.
pub struct SurfaceFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl SurfaceFrame {
    /// Queues the image for display.
    pub fn present(self) {
        drop(self.view);
        self.surface_texture.present();
    }
}
