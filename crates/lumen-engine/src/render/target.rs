use crate::gfx::{GraphicsDevice, RenderTarget, Resolution, TargetDesc, TargetId};

use super::RenderError;

/// One offscreen color (+ optional depth) attachment set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameTarget {
    id: TargetId,
    resolution: Resolution,
    samples: u32,
}

impl FrameTarget {
    #[inline]
    pub fn id(&self) -> TargetId {
        self.id
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    #[inline]
    pub fn samples(&self) -> u32 {
        self.samples
    }

    #[inline]
    pub fn as_render_target(&self) -> RenderTarget {
        RenderTarget::Offscreen(self.id)
    }
}

/// The multisampled scene target and its single-sampled resolve target.
#[derive(Debug)]
pub struct FrameTargets {
    pub multisampled: FrameTarget,
    pub resolve: FrameTarget,
}

impl FrameTargets {
    /// Allocates both targets at `resolution`. If the second allocation fails
    /// the first is destroyed, so either both exist or neither does.
    pub fn allocate(
        device: &mut dyn GraphicsDevice,
        resolution: Resolution,
        samples: u32,
    ) -> Result<Self, RenderError> {
        if !resolution.is_valid() {
            return Err(RenderError::InvalidResolution(resolution));
        }
        let samples = samples.max(1);

        let multisampled = allocate_one(device, "scene", resolution, samples, true)
            .map_err(|source| RenderError::TargetAllocation { which: "multisampled", source })?;

        let resolve = match allocate_one(device, "resolve", resolution, 1, false) {
            Ok(t) => t,
            Err(source) => {
                device.destroy_target(multisampled.id);
                return Err(RenderError::TargetAllocation { which: "resolve", source });
            }
        };

        log::debug!(
            "frame targets allocated at {}x{} ({samples}x MSAA)",
            resolution.width,
            resolution.height
        );
        Ok(Self { multisampled, resolve })
    }

    /// Resolves every pixel of the multisampled target into the resolve
    /// target. Needs no frame in progress.
    pub fn resolve(&self, device: &mut dyn GraphicsDevice) {
        device.blit(self.multisampled.id, self.resolve.id, self.resolution().full_region());
    }

    pub fn release(self, device: &mut dyn GraphicsDevice) {
        device.destroy_target(self.multisampled.id);
        device.destroy_target(self.resolve.id);
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.multisampled.resolution
    }
}

fn allocate_one(
    device: &mut dyn GraphicsDevice,
    label: &str,
    resolution: Resolution,
    samples: u32,
    depth: bool,
) -> Result<FrameTarget, crate::gfx::DeviceError> {
    let id = device.create_target(&TargetDesc {
        label: format!("{label} target"),
        resolution,
        samples,
        depth,
    })?;
    Ok(FrameTarget { id, resolution, samples })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::SoftDevice;

    #[test]
    fn allocates_pair_at_resolution() {
        let mut dev = SoftDevice::new(Resolution::new(8, 6));
        let targets = FrameTargets::allocate(&mut dev, Resolution::new(8, 6), 4).unwrap();
        assert_eq!(targets.multisampled.samples(), 4);
        assert_eq!(targets.resolve.samples(), 1);
        assert_eq!(targets.resolve.resolution(), Resolution::new(8, 6));
        assert_eq!(dev.live_resources().targets, 2);

        targets.release(&mut dev);
        assert_eq!(dev.live_resources().targets, 0);
    }

    #[test]
    fn resolve_averages_each_pixels_samples() {
        let res = Resolution::new(2, 2);
        let mut dev = SoftDevice::new(res);
        let targets = FrameTargets::allocate(&mut dev, res, 4).unwrap();
        let ms = targets.multisampled.id();

        let samples = [
            [1.0, 0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0, 1.0],
            [0.0, 0.0, 1.0, 1.0],
            [1.0, 1.0, 1.0, 1.0],
        ];
        for (s, color) in samples.into_iter().enumerate() {
            assert!(dev.write_sample(ms, 1, 0, s as u32, color));
        }
        for s in 0..4 {
            assert!(dev.write_sample(ms, 0, 1, s, [0.25, 0.5, 0.75, 1.0]));
        }

        targets.resolve(&mut dev);

        let resolve = targets.resolve.as_render_target();
        assert_eq!(dev.read_pixel(resolve, 1, 0), Some([0.5, 0.5, 0.5, 1.0]));
        assert_eq!(dev.read_pixel(resolve, 0, 1), Some([0.25, 0.5, 0.75, 1.0]));
        assert_eq!(dev.read_pixel(resolve, 0, 0), Some([0.0; 4]));

        targets.release(&mut dev);
    }

    #[test]
    fn failed_multisampled_target_leaves_nothing() {
        let mut dev = SoftDevice::new(Resolution::new(8, 6));
        dev.reject_targets_with_samples(4);
        let err = FrameTargets::allocate(&mut dev, Resolution::new(8, 6), 4).unwrap_err();
        assert!(matches!(err, RenderError::TargetAllocation { which: "multisampled", .. }));
        assert_eq!(dev.live_resources().targets, 0);
    }

    #[test]
    fn failed_resolve_target_releases_multisampled() {
        let mut dev = SoftDevice::new(Resolution::new(8, 6));
        dev.reject_targets_with_samples(1);
        let err = FrameTargets::allocate(&mut dev, Resolution::new(8, 6), 4).unwrap_err();
        assert!(matches!(err, RenderError::TargetAllocation { which: "resolve", .. }));
        assert_eq!(dev.live_resources().targets, 0);
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let mut dev = SoftDevice::new(Resolution::new(8, 6));
        let err = FrameTargets::allocate(&mut dev, Resolution::new(0, 6), 4).unwrap_err();
        assert!(matches!(err, RenderError::InvalidResolution(_)));
    }
}
