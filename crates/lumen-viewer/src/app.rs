//! Render loop driver.

use anyhow::Result;

use lumen_engine::core::{App, AppControl, FrameCtx};
use lumen_engine::renderer::{Renderer, RendererConfig, supported_samples};
use lumen_engine::settings::{SceneSettings, ViewSettings};

use crate::config::ViewerConfig;
use crate::controls::Controls;

const STATS_INTERVAL: u64 = 600;

/// Owns the renderer and the user-editable settings.
///
/// The renderer is built on the first frame, once a device exists. A setup
/// or render failure ends the loop and is kept for [`ViewerApp::finish`].
pub struct ViewerApp {
    config: ViewerConfig,
    controls: Controls,
    view: ViewSettings,
    scene: SceneSettings,
    renderer: Option<Renderer>,
    error: Option<anyhow::Error>,
    frame_seconds: f32,
}

impl ViewerApp {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            controls: Controls::new(config.orbit_speed, config.zoom_speed),
            view: config.view_settings(),
            scene: SceneSettings::default(),
            renderer: None,
            error: None,
            frame_seconds: 0.0,
            config,
        }
    }

    /// The deferred error of the loop, if any.
    pub fn finish(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn setup(&mut self, ctx: &FrameCtx<'_, '_>) -> Result<()> {
        let rctx = ctx.render_ctx();
        let samples = supported_samples(ctx.gpu.adapter(), rctx.device, self.config.samples);
        if samples != self.config.samples {
            log::warn!("{} MSAA samples unsupported, using {samples}", self.config.samples);
        }

        let renderer_config = RendererConfig {
            samples,
            ..self.config.renderer_config()
        };
        let renderer = Renderer::setup(&rctx, renderer_config, &self.config.scene_assets())?;

        let failed = renderer.diagnostics();
        if !failed.is_empty() {
            log::error!(
                "{} GPU program(s) failed to build, output will be incomplete: {}",
                failed.len(),
                failed.join(", ")
            );
        }

        self.renderer = Some(renderer);
        Ok(())
    }

    fn fail(&mut self, err: anyhow::Error) -> AppControl {
        self.error = Some(err);
        AppControl::Exit
    }

    fn report_timing(&mut self, dt: f32, frame_index: u64) {
        self.frame_seconds += dt;
        if frame_index > 0 && frame_index % STATS_INTERVAL == 0 {
            let avg_ms = self.frame_seconds * 1000.0 / STATS_INTERVAL as f32;
            log::debug!("frame {frame_index}: {avg_ms:.2} ms average");
            self.frame_seconds = 0.0;
        }
    }
}

impl App for ViewerApp {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.error.is_some() {
            return AppControl::Exit;
        }
        if self.renderer.is_none() {
            if let Err(err) = self.setup(ctx) {
                return self.fail(err);
            }
        }

        let outcome = self.controls.apply(ctx.input_frame, &mut self.view, &mut self.scene);
        if let Some(captured) = outcome.capture {
            ctx.window.set_cursor_captured(captured);
        }
        if outcome.exit {
            return AppControl::Exit;
        }

        self.report_timing(ctx.time.dt, ctx.time.frame_index);

        let Some(renderer) = self.renderer.as_mut() else {
            return AppControl::Exit;
        };
        let (view, scene) = (&self.view, &self.scene);
        match ctx.render(|rctx, target| renderer.render(rctx, target, view, scene)) {
            Ok(control) => control,
            Err(err) => self.fail(err),
        }
    }

    fn on_exit(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            let stats = renderer.stats();
            log::info!(
                "shutting down after {} frames ({} attachment reallocations)",
                stats.frames,
                stats.reallocations
            );
            renderer.shutdown();
        }
    }
}
