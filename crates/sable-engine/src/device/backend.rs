//! The seam between the batching renderer and a concrete graphics API.
//!
//! Handles are opaque slotmap keys owned by the backend. Commands recorded
//! between `begin_commands` and `end_commands` execute in order on `submit`.

use std::fmt;

use slotmap::new_key_type;

use super::RendererError;
use crate::paint::Color;

new_key_type! {
    pub struct BufferId;
    pub struct ImageId;
    pub struct FramebufferId;
    pub struct PipelineId;
    pub struct ResourceSetId;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

#[derive(Debug, Clone)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub size: u64,
    pub usage: BufferUsage,
}

/// Pixel format family of an image.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ImageFormat {
    /// 8-bit RGBA texels in sRGB encoding.
    Rgba8,
    /// Same format as the swapchain, so pipelines can target both.
    Target,
}

#[derive(Debug, Clone)]
pub struct ImageDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub sample_count: u32,
    pub format: ImageFormat,
    pub render_target: bool,
}

/// Color attachment plus optional single-sample image it resolves into.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FramebufferDesc {
    pub color: ImageId,
    pub resolve: Option<ImageId>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// Stages that can read a shader's uniform block.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformStage {
    Vertex,
    Fragment,
    Both,
}

impl UniformStage {
    pub fn union(self, other: UniformStage) -> UniformStage {
        if self == other { self } else { UniformStage::Both }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformBinding {
    pub size: u64,
    pub stage: UniformStage,
}

/// A graphics pipeline consuming [`crate::render::Vertex`] data.
///
/// Entry points are `vs_main` and `fs_main`. Bind group 0 holds the texture
/// (binding 0), its sampler (binding 1) and the optional uniform block (binding 2).
#[derive(Debug, Clone)]
pub struct PipelineDesc<'a> {
    pub label: &'a str,
    pub vertex_source: &'a str,
    pub fragment_source: &'a str,
    pub uniforms: Option<UniformBinding>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ResourceSetDesc {
    pub pipeline: PipelineId,
    pub image: ImageId,
    pub uniforms: Option<BufferId>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FramebufferTarget {
    Swapchain,
    Offscreen(FramebufferId),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Where texture coordinate v = 0 lies when sampling a rendered image.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UvOrigin {
    TopLeft,
    BottomLeft,
}

pub trait GpuBackend {
    /// Short name of the API actually driving the device, for logs.
    fn backend_name(&self) -> String;

    fn swapchain_size(&self) -> (u32, u32);

    fn uv_origin(&self) -> UvOrigin {
        UvOrigin::TopLeft
    }

    fn supports_sample_count(&self, count: u32) -> bool;

    fn resize(&mut self, width: u32, height: u32);

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, RendererError>;
    fn update_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]);
    fn destroy_buffer(&mut self, buffer: BufferId);

    /// `pixels`, when given, fills mip level 0 with tightly packed RGBA8 rows.
    fn create_image(
        &mut self,
        desc: &ImageDesc<'_>,
        pixels: Option<&[u8]>,
    ) -> Result<ImageId, RendererError>;
    fn destroy_image(&mut self, image: ImageId);

    fn create_framebuffer(&mut self, desc: &FramebufferDesc)
    -> Result<FramebufferId, RendererError>;
    fn destroy_framebuffer(&mut self, framebuffer: FramebufferId);

    fn create_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineId, RendererError>;
    fn destroy_pipeline(&mut self, pipeline: PipelineId);

    fn create_resource_set(&mut self, desc: &ResourceSetDesc)
    -> Result<ResourceSetId, RendererError>;
    fn destroy_resource_set(&mut self, set: ResourceSetId);

    /// Opens a command list. Acquires the swapchain image if none is held yet.
    fn begin_commands(&mut self) -> Result<(), RendererError>;
    fn set_framebuffer(&mut self, target: FramebufferTarget);
    fn clear(&mut self, color: Color);
    fn set_viewport(&mut self, viewport: ViewportRect);
    fn set_scissor(&mut self, scissor: ScissorRect);
    fn set_vertex_buffer(&mut self, buffer: BufferId);
    fn set_index_buffer(&mut self, buffer: BufferId);
    fn set_pipeline(&mut self, pipeline: PipelineId);
    fn set_resource_set(&mut self, set: ResourceSetId);
    fn draw_indexed(&mut self, index_count: u32, index_start: u32, base_vertex: i32);
    fn generate_mipmaps(&mut self, image: ImageId);
    /// Copies the multisampled color of `framebuffer` into its resolve image.
    fn resolve(&mut self, framebuffer: FramebufferId);
    fn end_commands(&mut self);

    /// Executes everything recorded so far. The swapchain image stays held.
    fn submit(&mut self) -> Result<(), RendererError>;
    fn present(&mut self) -> Result<(), RendererError>;
}
