//! Lumen engine crate.
//!
//! A fixed offscreen-then-composite 3D frame pipeline ([`render`]) on top of
//! a small immediate-mode graphics device contract ([`gfx`]), plus the
//! window runtime that drives it.

pub mod core;
pub mod device;
pub mod gfx;
pub mod logging;
pub mod render;
pub mod scene;
pub mod time;
pub mod window;
