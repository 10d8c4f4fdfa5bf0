//! Window + runtime loop.
//!
//! Owns the `winit` event loop and one window per [`crate::render::Renderer`].

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
