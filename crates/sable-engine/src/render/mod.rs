//! Batched 2D rendering.
//!
//! [`Renderer`] records immediate-mode draw calls into CPU staging buffers
//! and turns them into as few indexed draws as the state changes allow.
//!
//! Convention:
//! - positions are pixels (top-left origin, +Y down) of the current target
//! - rotations are radians, clockwise on screen
//! - vertex positions are projected to clip space on the CPU

mod batch;
mod geometry;
mod render_target;
mod renderer;
mod shader;
mod staging;
mod texture;
mod uniform;
mod vertex;

pub use batch::{Batch, BatchList, DrawState, merge_adjacent};
pub use geometry::circle_segments_for_radius;
pub use render_target::{RenderTarget, RenderTargetDesc, RenderTargetId, SampleCount};
pub use renderer::{FrameStats, Renderer, RendererConfig};
pub use shader::{
    DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER, Shader, ShaderDesc, ShaderId,
};
pub use texture::{Texture, TextureDesc, TextureId, TextureOrigin, max_mip_levels};
pub use uniform::{UniformBlock, UniformDesc, UniformType, UniformValue};
pub use vertex::{INDEX_SIZE, Vertex};

pub use crate::device::UniformStage;
