//! Color model shared between applications and the renderer.
//!
//! Colors are straight-alpha sRGB bytes. They travel to the GPU packed into a
//! single `u32` per vertex and are unpacked in the vertex shader.

pub mod color;

pub use color::Color;
