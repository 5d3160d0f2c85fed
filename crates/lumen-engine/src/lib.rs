//! Lumen engine crate.
//!
//! Platform runtime, GPU layer and the image-based PBR renderer used by the
//! viewer binary.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod assets;
pub mod gpu;
pub mod ibl;
pub mod pbr;
pub mod renderer;
pub mod settings;

/// WGSL programs shipped with the crate.
pub const SHADER_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders");
