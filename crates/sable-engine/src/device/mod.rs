//! Graphics device abstraction and its implementations.
//!
//! - [`GpuBackend`] is the contract the batching renderer records against
//! - [`Gpu`] drives a window surface through wgpu
//! - [`RecordingBackend`] keeps everything in memory for headless use and tests

mod backend;
mod error;
mod gpu;
mod init;
mod mipmap;
mod recording;
mod replay;
mod surface;
mod validate;

pub use backend::{
    BufferDesc, BufferId, BufferUsage, FramebufferDesc, FramebufferId, FramebufferTarget,
    GpuBackend, ImageDesc, ImageFormat, ImageId, PipelineDesc, PipelineId, ResourceSetDesc,
    ResourceSetId, ScissorRect, ShaderStage, UniformBinding, UniformStage, UvOrigin,
    ViewportRect,
};
pub use error::{RendererError, ResourceKind, SurfaceErrorAction};
pub use gpu::Gpu;
pub use init::{GpuInit, GraphicsApi};
pub use recording::{GpuCall, RecordedImage, RecordingBackend};
pub use validate::validate_wgsl;
