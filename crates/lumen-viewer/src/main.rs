//! Interactive PBR viewer.
//!
//! Usage: `lumen-viewer [config.json]`
//!
//! Left drag orbits the camera, right drag rotates the model, the wheel
//! zooms, F1-F3 toggle the three lights and Escape quits.

mod app;
mod config;
mod controls;

use std::path::PathBuf;

use anyhow::Result;

use lumen_engine::device::GpuInit;
use lumen_engine::logging::{LoggingConfig, init_logging};
use lumen_engine::window::Runtime;

use app::ViewerApp;
use config::ViewerConfig;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ViewerConfig::load(config_path.as_deref())?;

    let runtime_config = config.runtime_config();
    let app = Runtime::run(runtime_config, GpuInit::default(), ViewerApp::new(config))?;
    app.finish()
}
