//! Sable: a batched immediate-mode 2D renderer.
//!
//! [`render::Renderer`] is generic over [`device::GpuBackend`]. [`device::Gpu`]
//! implements it on wgpu for a winit window; [`device::RecordingBackend`]
//! records calls in memory for tests and tools.

pub mod coords;
pub mod device;
pub mod paint;
pub mod render;

pub mod core;
pub mod logging;
pub mod time;
pub mod window;

pub use device::RendererError;
