//! In-memory [`GpuBackend`] that records every call instead of touching a GPU.
//!
//! Buffer writes are applied to byte vectors so uploaded geometry can be read
//! back. Shader sources still go through WGSL validation.

use slotmap::SlotMap;

use super::validate::validate_wgsl;
use super::{
    BufferDesc, BufferId, BufferUsage, FramebufferDesc, FramebufferId, FramebufferTarget,
    GpuBackend, ImageDesc, ImageId, PipelineDesc, PipelineId, RendererError, ResourceSetDesc,
    ResourceSetId, ScissorRect, ShaderStage, UvOrigin, ViewportRect,
};
use crate::paint::Color;

/// Records a backend call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateBuffer {
        id: BufferId,
        size: u64,
        usage: BufferUsage,
    },
    UpdateBuffer {
        id: BufferId,
        offset: u64,
        len: usize,
    },
    DestroyBuffer(BufferId),
    CreateImage {
        id: ImageId,
        width: u32,
        height: u32,
        mip_levels: u32,
        sample_count: u32,
    },
    DestroyImage(ImageId),
    CreateFramebuffer(FramebufferId),
    DestroyFramebuffer(FramebufferId),
    CreatePipeline(PipelineId),
    DestroyPipeline(PipelineId),
    CreateResourceSet {
        id: ResourceSetId,
        image: ImageId,
    },
    DestroyResourceSet(ResourceSetId),
    BeginCommands,
    SetFramebuffer(FramebufferTarget),
    Clear(Color),
    SetViewport(ViewportRect),
    SetScissor(ScissorRect),
    SetVertexBuffer(BufferId),
    SetIndexBuffer(BufferId),
    SetPipeline(PipelineId),
    SetResourceSet(ResourceSetId),
    DrawIndexed {
        index_count: u32,
        index_start: u32,
        base_vertex: i32,
    },
    GenerateMipmaps(ImageId),
    Resolve(FramebufferId),
    EndCommands,
    Submit,
    Present,
    Resize {
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone)]
pub struct RecordedImage {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub sample_count: u32,
    pub render_target: bool,
}

#[derive(Debug, Clone)]
struct RecordedFramebuffer {
    color: ImageId,
    resolve: Option<ImageId>,
}

pub struct RecordingBackend {
    calls: Vec<GpuCall>,
    buffers: SlotMap<BufferId, Vec<u8>>,
    images: SlotMap<ImageId, RecordedImage>,
    framebuffers: SlotMap<FramebufferId, RecordedFramebuffer>,
    pipelines: SlotMap<PipelineId, String>,
    resource_sets: SlotMap<ResourceSetId, ImageId>,
    size: (u32, u32),
    uv_origin: UvOrigin,
    max_sample_count: u32,
    recording: bool,
    submits: u32,
    failing_submits: u32,
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            calls: Vec::new(),
            buffers: SlotMap::with_key(),
            images: SlotMap::with_key(),
            framebuffers: SlotMap::with_key(),
            pipelines: SlotMap::with_key(),
            resource_sets: SlotMap::with_key(),
            size: (width, height),
            uv_origin: UvOrigin::TopLeft,
            max_sample_count: 8,
            recording: false,
            submits: 0,
            failing_submits: 0,
        }
    }

    /// Pretends to be an API whose rendered images have v = 0 at the bottom.
    pub fn with_uv_origin(mut self, origin: UvOrigin) -> Self {
        self.uv_origin = origin;
        self
    }

    pub fn with_max_sample_count(mut self, count: u32) -> Self {
        self.max_sample_count = count;
        self
    }

    /// Makes the first `count` submissions fail as a lost device would.
    pub fn with_failing_submits(mut self, count: u32) -> Self {
        self.failing_submits = count;
        self
    }

    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn buffer_contents(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(id).map(Vec::as_slice)
    }

    pub fn image(&self, id: ImageId) -> Option<&RecordedImage> {
        self.images.get(id)
    }

    pub fn live_images(&self) -> usize {
        self.images.len()
    }

    pub fn live_resource_sets(&self) -> usize {
        self.resource_sets.len()
    }

    /// Image sampled through a resource set.
    pub fn resource_set_image(&self, id: ResourceSetId) -> Option<ImageId> {
        self.resource_sets.get(id).copied()
    }

    /// `(index_count, index_start, base_vertex)` of every draw, in order.
    pub fn draws(&self) -> Vec<(u32, u32, i32)> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                GpuCall::DrawIndexed {
                    index_count,
                    index_start,
                    base_vertex,
                } => Some((index_count, index_start, base_vertex)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&GpuCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    fn command(&mut self, call: GpuCall) {
        if !self.recording {
            log::warn!("{call:?} issued outside begin_commands/end_commands; ignored");
            return;
        }
        self.calls.push(call);
    }
}

impl GpuBackend for RecordingBackend {
    fn backend_name(&self) -> String {
        "recording".to_string()
    }

    fn swapchain_size(&self) -> (u32, u32) {
        self.size
    }

    fn uv_origin(&self) -> UvOrigin {
        self.uv_origin
    }

    fn supports_sample_count(&self, count: u32) -> bool {
        count.is_power_of_two() && count <= self.max_sample_count
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.size = (width, height);
        }
        self.calls.push(GpuCall::Resize { width, height });
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, RendererError> {
        if desc.size == 0 {
            return Err(RendererError::InvalidDescriptor(format!(
                "buffer `{}` has zero size",
                desc.label
            )));
        }
        let id = self.buffers.insert(vec![0; desc.size as usize]);
        self.calls.push(GpuCall::CreateBuffer {
            id,
            size: desc.size,
            usage: desc.usage,
        });
        Ok(id)
    }

    fn update_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) {
        let Some(bytes) = self.buffers.get_mut(buffer) else {
            log::warn!("update of destroyed buffer ignored");
            return;
        };
        let start = offset as usize;
        let end = start + data.len();
        assert!(end <= bytes.len(), "buffer write {start}..{end} out of bounds");
        bytes[start..end].copy_from_slice(data);
        self.calls.push(GpuCall::UpdateBuffer {
            id: buffer,
            offset,
            len: data.len(),
        });
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(buffer);
        self.calls.push(GpuCall::DestroyBuffer(buffer));
    }

    fn create_image(
        &mut self,
        desc: &ImageDesc<'_>,
        pixels: Option<&[u8]>,
    ) -> Result<ImageId, RendererError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(RendererError::InvalidDescriptor(format!(
                "image `{}` has zero size",
                desc.label
            )));
        }
        if desc.sample_count > 1 && !self.supports_sample_count(desc.sample_count) {
            return Err(RendererError::UnsupportedFeature(format!(
                "{}x multisampling",
                desc.sample_count
            )));
        }
        if let Some(pixels) = pixels {
            let expected = desc.width as usize * desc.height as usize * 4;
            if pixels.len() != expected {
                return Err(RendererError::InvalidDescriptor(format!(
                    "image `{}` expects {expected} bytes of RGBA8, got {}",
                    desc.label,
                    pixels.len()
                )));
            }
        }

        let id = self.images.insert(RecordedImage {
            label: desc.label.to_string(),
            width: desc.width,
            height: desc.height,
            mip_levels: desc.mip_levels.max(1),
            sample_count: desc.sample_count.max(1),
            render_target: desc.render_target,
        });
        self.calls.push(GpuCall::CreateImage {
            id,
            width: desc.width,
            height: desc.height,
            mip_levels: desc.mip_levels.max(1),
            sample_count: desc.sample_count.max(1),
        });
        Ok(id)
    }

    fn destroy_image(&mut self, image: ImageId) {
        self.images.remove(image);
        self.calls.push(GpuCall::DestroyImage(image));
    }

    fn create_framebuffer(
        &mut self,
        desc: &FramebufferDesc,
    ) -> Result<FramebufferId, RendererError> {
        if !self.images.contains_key(desc.color)
            || desc.resolve.is_some_and(|r| !self.images.contains_key(r))
        {
            return Err(RendererError::InvalidDescriptor(
                "framebuffer attachment is destroyed".into(),
            ));
        }
        let id = self.framebuffers.insert(RecordedFramebuffer {
            color: desc.color,
            resolve: desc.resolve,
        });
        self.calls.push(GpuCall::CreateFramebuffer(id));
        Ok(id)
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.framebuffers.remove(framebuffer);
        self.calls.push(GpuCall::DestroyFramebuffer(framebuffer));
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineId, RendererError> {
        validate_wgsl(ShaderStage::Vertex, desc.vertex_source)?;
        validate_wgsl(ShaderStage::Fragment, desc.fragment_source)?;
        let id = self.pipelines.insert(desc.label.to_string());
        self.calls.push(GpuCall::CreatePipeline(id));
        Ok(id)
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineId) {
        self.pipelines.remove(pipeline);
        self.calls.push(GpuCall::DestroyPipeline(pipeline));
    }

    fn create_resource_set(
        &mut self,
        desc: &ResourceSetDesc,
    ) -> Result<ResourceSetId, RendererError> {
        if !self.pipelines.contains_key(desc.pipeline) || !self.images.contains_key(desc.image) {
            return Err(RendererError::InvalidDescriptor(
                "resource set refers to a destroyed pipeline or image".into(),
            ));
        }
        let id = self.resource_sets.insert(desc.image);
        self.calls.push(GpuCall::CreateResourceSet {
            id,
            image: desc.image,
        });
        Ok(id)
    }

    fn destroy_resource_set(&mut self, set: ResourceSetId) {
        self.resource_sets.remove(set);
        self.calls.push(GpuCall::DestroyResourceSet(set));
    }

    fn begin_commands(&mut self) -> Result<(), RendererError> {
        self.recording = true;
        self.calls.push(GpuCall::BeginCommands);
        Ok(())
    }

    fn set_framebuffer(&mut self, target: FramebufferTarget) {
        if let FramebufferTarget::Offscreen(id) = target {
            debug_assert!(self.framebuffers.contains_key(id), "binding destroyed framebuffer");
        }
        self.command(GpuCall::SetFramebuffer(target));
    }

    fn clear(&mut self, color: Color) {
        self.command(GpuCall::Clear(color));
    }

    fn set_viewport(&mut self, viewport: ViewportRect) {
        self.command(GpuCall::SetViewport(viewport));
    }

    fn set_scissor(&mut self, scissor: ScissorRect) {
        self.command(GpuCall::SetScissor(scissor));
    }

    fn set_vertex_buffer(&mut self, buffer: BufferId) {
        self.command(GpuCall::SetVertexBuffer(buffer));
    }

    fn set_index_buffer(&mut self, buffer: BufferId) {
        self.command(GpuCall::SetIndexBuffer(buffer));
    }

    fn set_pipeline(&mut self, pipeline: PipelineId) {
        self.command(GpuCall::SetPipeline(pipeline));
    }

    fn set_resource_set(&mut self, set: ResourceSetId) {
        self.command(GpuCall::SetResourceSet(set));
    }

    fn draw_indexed(&mut self, index_count: u32, index_start: u32, base_vertex: i32) {
        self.command(GpuCall::DrawIndexed {
            index_count,
            index_start,
            base_vertex,
        });
    }

    fn generate_mipmaps(&mut self, image: ImageId) {
        self.command(GpuCall::GenerateMipmaps(image));
    }

    fn resolve(&mut self, framebuffer: FramebufferId) {
        debug_assert!(
            self.framebuffers
                .get(framebuffer)
                .is_some_and(|fb| fb.resolve.is_some() && self.images.contains_key(fb.color)),
            "resolving a framebuffer without a resolve image"
        );
        self.command(GpuCall::Resolve(framebuffer));
    }

    fn end_commands(&mut self) {
        self.recording = false;
        self.calls.push(GpuCall::EndCommands);
    }

    fn submit(&mut self) -> Result<(), RendererError> {
        if self.recording {
            return Err(RendererError::FrameState("submit while commands are still open"));
        }
        self.calls.push(GpuCall::Submit);
        self.submits += 1;
        if self.submits <= self.failing_submits {
            return Err(RendererError::Presentation(format!(
                "submission {} rejected",
                self.submits
            )));
        }
        Ok(())
    }

    fn present(&mut self) -> Result<(), RendererError> {
        self.calls.push(GpuCall::Present);
        Ok(())
    }
}
