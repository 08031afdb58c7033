use thiserror::Error;

use crate::gfx::{DeviceError, Resolution};

use super::{FrameStage, ProgramKind};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to allocate the {which} frame target")]
    TargetAllocation {
        which: &'static str,
        #[source]
        source: DeviceError,
    },

    #[error("failed to load the {kind} shader program")]
    ShaderLoad {
        kind: ProgramKind,
        #[source]
        source: DeviceError,
    },

    #[error("failed to set up the screen quad")]
    QuadSetup(#[source] DeviceError),

    #[error("no scene is active")]
    NoActiveScene,

    #[error("the active scene has no camera")]
    MissingCamera,

    #[error("the active scene has no skybox")]
    MissingSkybox,

    #[error("frame stage {found:?} entered out of order (expected {expected:?})")]
    StageOrder {
        expected: FrameStage,
        found: FrameStage,
    },

    #[error("cannot allocate frame targets at {}x{}", .0.width, .0.height)]
    InvalidResolution(Resolution),
}
