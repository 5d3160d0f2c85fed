use anyhow::Result;
use winit::window::{CursorGrabMode, Window, WindowId};

use crate::device::Gpu;
use crate::input::{InputFrame, InputState};
use crate::renderer::{FrameTarget, RenderCtx};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id:     WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Drawable size in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    /// Hides and grabs the cursor while `captured`, releases it otherwise.
    ///
    /// Locking is tried first and confinement is the fallback; platforms that
    /// support neither only get the hidden cursor.
    pub fn set_cursor_captured(&self, captured: bool) {
        if captured {
            let grabbed = self
                .window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(e) = grabbed {
                log::debug!("cursor grab unavailable: {e}");
            }
        } else if let Err(e) = self.window.set_cursor_grab(CursorGrabMode::None) {
            log::debug!("cursor release failed: {e}");
        }
        self.window.set_cursor_visible(!captured);
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window:       WindowCtx<'a>,
    pub gpu:          &'a mut Gpu<'w>,
    pub input:        &'a InputState,
    pub input_frame:  &'a InputFrame,
    pub time:         FrameTime,
    pub runtime:      &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Renderer context for work outside a frame (setup, capability queries).
    pub fn render_ctx(&self) -> RenderCtx<'_> {
        let size = self.gpu.size();
        RenderCtx::new(
            self.gpu.device(),
            self.gpu.queue(),
            self.gpu.surface_format(),
            (size.width, size.height),
        )
    }

    /// Acquires the next surface image, calls `draw` with a [`RenderCtx`] and
    /// a [`FrameTarget`] over it, then presents.
    ///
    /// Recoverable surface errors skip the frame; a fatal one is returned as
    /// `Err`, as is an `Err` from `draw` (the frame is dropped unpresented).
    pub fn render<F>(&mut self, draw: F) -> Result<AppControl>
    where
        F: FnOnce(&RenderCtx<'_>, &mut FrameTarget<'_>) -> Result<()>,
    {
        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                self.gpu.recover(err)?;
                return Ok(AppControl::Continue);
            }
        };

        let rctx = self.render_ctx();

        // FrameTarget borrows frame.encoder; dropped before submit() takes frame.
        {
            let mut target = FrameTarget::new(&mut frame.encoder, &frame.view);
            draw(&rctx, &mut target)?;
        }

        self.window.window.pre_present_notify();
        self.gpu.submit(frame);

        Ok(AppControl::Continue)
    }
}
