//! Viewer configuration, read from an optional JSON file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use lumen_engine::renderer::{RendererConfig, SceneAssets};
use lumen_engine::settings::ViewSettings;
use lumen_engine::window::RuntimeConfig;
use winit::dpi::LogicalSize;

/// Everything the viewer lets a user change. Missing fields take the
/// defaults below, so `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    pub title: String,
    pub width: f64,
    pub height: f64,
    /// Requested MSAA samples; lowered to what the adapter supports.
    pub samples: u32,

    pub view_distance: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Degrees per pointer count while dragging.
    pub orbit_speed: f32,
    /// Distance per scroll line.
    pub zoom_speed: f32,

    pub exposure: f32,
    pub pure_white: f32,

    /// Prefix for every asset path below.
    pub asset_root: PathBuf,
    pub environment: PathBuf,
    pub skybox: PathBuf,
    pub meshes: Vec<PathBuf>,
    pub texture_dir: PathBuf,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "lumen".to_string(),
            width: 1280.0,
            height: 720.0,
            samples: 8,
            view_distance: 400.0,
            fov: 35.0,
            orbit_speed: 1.0,
            zoom_speed: 32.0,
            exposure: 1.0,
            pure_white: 1.0,
            asset_root: PathBuf::from("data"),
            environment: PathBuf::from("environment.hdr"),
            skybox: PathBuf::from("meshes/skybox.obj"),
            meshes: vec![
                PathBuf::from("meshes/cerberus.obj"),
                PathBuf::from("meshes/plate.obj"),
            ],
            texture_dir: PathBuf::from("textures"),
        }
    }
}

impl ViewerConfig {
    /// Reads `path` if given, else returns the defaults. A file that was
    /// asked for but cannot be read or parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            log::info!("no config file given, using defaults");
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        anyhow::ensure!(config.width > 0.0 && config.height > 0.0, "window size must be positive");
        anyhow::ensure!(config.samples > 0, "samples must be at least 1");
        Ok(config)
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            title: self.title.clone(),
            initial_size: LogicalSize::new(self.width, self.height),
        }
    }

    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            samples: self.samples,
            exposure: self.exposure,
            pure_white: self.pure_white,
            ..RendererConfig::default()
        }
    }

    pub fn scene_assets(&self) -> SceneAssets {
        let root = &self.asset_root;
        SceneAssets {
            environment: root.join(&self.environment),
            skybox: root.join(&self.skybox),
            meshes: self.meshes.iter().map(|m| root.join(m)).collect(),
            texture_dir: root.join(&self.texture_dir),
        }
    }

    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            distance: self.view_distance,
            fov: self.fov,
            ..ViewSettings::default()
        }
    }
}
