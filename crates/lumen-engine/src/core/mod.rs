//! Core engine-facing contracts.
//!
//! The interface between the runtime (platform loop) and the driver: the
//! `App` callbacks and the per-frame context handed to them.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
