//! Device, queue and swapchain for a window, plus the adapter queries the
//! renderer depends on (MSAA sample counts, compute workgroup limits) and a
//! window-less device for tests.

mod adapter;
mod context;
mod frame;
mod init;
mod surface;

pub use adapter::{compute_limits, headless, max_sample_count};
pub use context::Gpu;
pub use frame::GpuFrame;
pub use init::GpuInit;
