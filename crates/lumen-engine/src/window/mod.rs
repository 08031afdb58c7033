//! Window runtime: the winit event loop wired to one graphics device per window.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
