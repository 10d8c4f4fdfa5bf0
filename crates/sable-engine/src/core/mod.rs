//! Application-facing contracts.
//!
//! The runtime owns windows and renderers; apps only see them through
//! [`App`] callbacks and the per-frame [`FrameCtx`].

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
