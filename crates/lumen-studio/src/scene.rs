use anyhow::{Context, Result};
use glam::Vec3;
use lumen_engine::gfx::GraphicsDevice;
use lumen_engine::scene::{
    Camera, Drawable, DrawableQueue, PerspectiveCamera, Scene, SceneProvider, Skybox,
};

use crate::model::{Model, ModelAssets};
use crate::skybox::GradientSkybox;

const PALETTES: [([u8; 4], [u8; 4]); 3] = [
    ([230, 90, 70, 255], [250, 235, 220, 255]),
    ([70, 140, 220, 255], [225, 235, 250, 255]),
    ([90, 190, 110, 255], [230, 245, 230, 255]),
];

const ORBIT_RADIUS: f32 = 9.0;
const ORBIT_HEIGHT: f32 = 3.5;
/// Radians per second.
const ORBIT_SPEED: f32 = 0.25;

/// A ring of spinning cubes under an orbiting camera.
pub struct DemoScene {
    camera: PerspectiveCamera,
    skybox: GradientSkybox,
    assets: ModelAssets,
    models: Vec<Model>,
}

impl DemoScene {
    pub fn new(device: &mut dyn GraphicsDevice) -> Result<Self> {
        let skybox = GradientSkybox::new(device).context("failed to build the skybox")?;
        let assets = match ModelAssets::new(device, &PALETTES) {
            Ok(assets) => assets,
            Err(e) => {
                skybox.release(device);
                return Err(e).context("failed to upload model assets");
            }
        };

        let mut models = vec![
            Model::cube(&assets, assets.materials[0], Vec3::ZERO, 1.2)
                .spinning(Vec3::new(0.3, 1.0, 0.1), 0.6),
        ];
        for i in 0..6 {
            let angle = i as f32 / 6.0 * std::f32::consts::TAU;
            let position = Vec3::new(angle.cos() * 4.0, 0.0, angle.sin() * 4.0);
            let material = assets.materials[1 + i % 2];
            models.push(
                Model::cube(&assets, material, position, 0.6)
                    .spinning(Vec3::new(1.0, 0.5, 0.0), 1.0 + i as f32 * 0.15),
            );
        }
        log::info!("demo scene: {} models", models.len());

        Ok(Self {
            camera: PerspectiveCamera::new(Vec3::new(0.0, ORBIT_HEIGHT, ORBIT_RADIUS), Vec3::ZERO),
            skybox,
            assets,
            models,
        })
    }

    /// Advances the animation to `seconds` and fits the camera to `aspect`.
    pub fn update(&mut self, seconds: f32, aspect: f32) {
        self.camera.set_aspect(aspect);
        self.camera.orbit(seconds * ORBIT_SPEED, ORBIT_RADIUS, ORBIT_HEIGHT);
        for model in &mut self.models {
            model.set_time(seconds);
        }
    }

    pub fn release(self, device: &mut dyn GraphicsDevice) {
        self.skybox.release(device);
        self.assets.release(device);
    }
}

impl Scene for DemoScene {
    fn camera(&self) -> Option<&dyn Camera> {
        Some(&self.camera)
    }

    fn skybox(&self) -> Option<&dyn Skybox> {
        Some(&self.skybox)
    }

    fn visible_drawables(&self) -> DrawableQueue<'_> {
        self.models.iter().map(|m| m as &dyn Drawable).collect()
    }
}

impl SceneProvider for DemoScene {
    fn current_scene(&self) -> Option<&dyn Scene> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use lumen_engine::gfx::{Resolution, SoftDevice};
    use lumen_engine::render::{PipelineConfig, RenderPipeline};

    use super::*;

    #[test]
    fn renders_on_the_software_device() {
        let mut dev = SoftDevice::new(Resolution::new(32, 18));
        let mut pipeline = RenderPipeline::start_up(&mut dev, PipelineConfig::default()).unwrap();
        let mut scene = DemoScene::new(&mut dev).unwrap();

        scene.update(1.5, Resolution::new(32, 18).aspect());
        let report = pipeline.render(&mut dev, &scene, 1500).unwrap();
        assert_eq!(report.drawables, 7);
        assert_eq!(dev.presented_frames(), 1);

        // The center cube sits in the middle of the view.
        let center = dev.read_pixel(lumen_engine::gfx::RenderTarget::Screen, 16, 9).unwrap();
        let background = lumen_engine::gfx::Color::white().to_array();
        assert_ne!(center, background);

        scene.release(&mut dev);
        pipeline.shut_down(&mut dev);
        assert_eq!(dev.live_resources().total(), 0);
    }

    #[test]
    fn camera_keeps_its_orbit() {
        let mut dev = SoftDevice::new(Resolution::new(4, 4));
        let mut scene = DemoScene::new(&mut dev).unwrap();
        scene.update(10.0, 2.0);
        let eye = scene.camera.position();
        assert!((Vec3::new(eye.x, 0.0, eye.z).length() - ORBIT_RADIUS).abs() < 1e-3);
        assert_eq!(eye.y, ORBIT_HEIGHT);
        assert_eq!(scene.camera.aspect, 2.0);
        scene.release(&mut dev);
    }
}
