use crate::gfx::Color;

use super::{LightingConfig, ShaderSources};

/// Frame pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Samples per pixel of the scene target. 1 disables multisampling.
    pub sample_count: u32,

    /// Background for both the scene target and the screen.
    pub clear_color: Color,

    pub lighting: LightingConfig,
    pub shaders: ShaderSources,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_count: 4,
            clear_color: Color::white(),
            lighting: LightingConfig::default(),
            shaders: ShaderSources::default(),
        }
    }
}
