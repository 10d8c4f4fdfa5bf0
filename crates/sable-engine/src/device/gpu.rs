use std::collections::HashMap;

use slotmap::SlotMap;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::mipmap::MipmapGenerator;
use super::replay::{self, Command, CommandList, ReplayContext};
use super::surface;
use super::validate::{FRAGMENT_ENTRY, VERTEX_ENTRY, validate_wgsl};
use super::{
    BufferDesc, BufferId, BufferUsage, FramebufferDesc, FramebufferId, FramebufferTarget,
    GpuBackend, GpuInit, ImageDesc, ImageFormat, ImageId, PipelineDesc, PipelineId,
    RendererError, ResourceSetDesc, ResourceSetId, ScissorRect, ShaderStage, SurfaceErrorAction,
    UniformStage, ViewportRect,
};
use crate::paint::Color;
use crate::render::Vertex;

pub(crate) struct GpuImage {
    pub texture: wgpu::Texture,
    /// All mip levels, for sampling.
    pub view: wgpu::TextureView,
    /// Mip level 0 only, for rendering into.
    pub attachment_view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

pub(crate) struct GpuFramebuffer {
    pub color: ImageId,
    pub resolve: Option<ImageId>,
    pub sample_count: u32,
}

pub(crate) struct GpuPipeline {
    label: String,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    bind_group_layout: wgpu::BindGroupLayout,
    has_uniforms: bool,
    format: wgpu::TextureFormat,
    /// Keyed by sample count of the target being drawn into.
    variants: HashMap<u32, wgpu::RenderPipeline>,
}

impl GpuPipeline {
    pub(crate) fn variant(&mut self, device: &wgpu::Device, sample_count: u32) -> &wgpu::RenderPipeline {
        self.variants.entry(sample_count).or_insert_with(|| {
            log::debug!("building pipeline `{}` for {}x sampling", self.label, sample_count);
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&self.label),
                layout: Some(&self.layout),
                vertex: wgpu::VertexState {
                    module: &self.vertex,
                    entry_point: Some(VERTEX_ENTRY),
                    compilation_options: Default::default(),
                    buffers: &[Vertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.fragment,
                    entry_point: Some(FRAGMENT_ENTRY),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: sample_count,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview_mask: None,
                cache: None,
            })
        })
    }
}

#[derive(Default)]
pub(crate) struct GpuResources {
    pub buffers: SlotMap<BufferId, wgpu::Buffer>,
    pub images: SlotMap<ImageId, GpuImage>,
    pub framebuffers: SlotMap<FramebufferId, GpuFramebuffer>,
    pub pipelines: SlotMap<PipelineId, GpuPipeline>,
    pub resource_sets: SlotMap<ResourceSetId, wgpu::BindGroup>,
}

struct AcquiredFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

/// wgpu implementation of [`GpuBackend`], bound to one window's surface.
///
/// - creates and stores Adapter/Device/Queue
/// - creates and configures the Surface (swapchain)
/// - records backend commands and replays them into render passes on submit
pub struct Gpu<'w> {
    /// Window the surface presents to.
    window: &'w Window,

    /// Surface bound to the window.
    ///
    /// Surface lifetime is tied to the window; architecture must ensure the window
    /// outlives the `Gpu` instance.
    surface: wgpu::Surface<'w>,

    adapter: wgpu::Adapter,
    adapter_info: wgpu::AdapterInfo,
    device: wgpu::Device,
    queue: wgpu::Queue,

    /// Active surface configuration.
    config: wgpu::SurfaceConfiguration,

    /// Current drawable size in physical pixels.
    size: PhysicalSize<u32>,

    resources: GpuResources,
    commands: CommandList,
    frame: Option<AcquiredFrame>,
    mipmaps: MipmapGenerator,
}

impl<'w> Gpu<'w> {
    /// Creates a GPU context bound to a window.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self, RendererError> {
        init.api.check_platform()?;

        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(RendererError::InvalidDescriptor(
                "window has zero size".to_string(),
            ));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.api.backends(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| RendererError::SurfaceCreationFailed(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| {
                RendererError::DeviceCreationFailed(format!(
                    "no {} adapter for this surface: {e}",
                    init.api
                ))
            })?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("sable device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| RendererError::DeviceCreationFailed(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps, init.prefer_srgb).ok_or_else(|| {
            RendererError::SurfaceCreationFailed("surface reports no supported formats".into())
        })?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: surface::choose_present_mode(&caps, init.vsync),
            alpha_mode: surface::choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        let adapter_info = adapter.get_info();
        log::info!(
            "gpu: {} via {:?} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.backend,
            format,
            config.present_mode
        );

        Ok(Gpu {
            window,
            surface,
            adapter,
            adapter_info,
            device,
            queue,
            config,
            size,
            resources: GpuResources::default(),
            commands: CommandList::default(),
            frame: None,
            mipmaps: MipmapGenerator::new(),
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn acquire_frame(&mut self) -> Result<(), RendererError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(err) => {
                match surface::map_surface_error(
                    &self.surface,
                    &self.device,
                    &self.config,
                    self.size,
                    &err,
                ) {
                    SurfaceErrorAction::Reconfigured => match self.surface.get_current_texture() {
                        Ok(t) => t,
                        Err(retry) => {
                            log::debug!("swapchain still unavailable after reconfigure: {retry}");
                            return Ok(());
                        }
                    },
                    SurfaceErrorAction::SkipFrame => {
                        log::debug!("skipping frame: {err}");
                        return Ok(());
                    }
                    SurfaceErrorAction::Fatal => {
                        return Err(RendererError::Presentation(format!(
                            "failed to acquire swapchain image: {err}"
                        )));
                    }
                }
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.frame = Some(AcquiredFrame {
            surface_texture,
            view,
        });
        Ok(())
    }

    fn texture_format(&self, format: ImageFormat) -> wgpu::TextureFormat {
        match format {
            ImageFormat::Rgba8 => wgpu::TextureFormat::Rgba8UnormSrgb,
            ImageFormat::Target => self.config.format,
        }
    }
}

fn shader_stages(stage: UniformStage) -> wgpu::ShaderStages {
    match stage {
        UniformStage::Vertex => wgpu::ShaderStages::VERTEX,
        UniformStage::Fragment => wgpu::ShaderStages::FRAGMENT,
        UniformStage::Both => wgpu::ShaderStages::VERTEX_FRAGMENT,
    }
}

impl GpuBackend for Gpu<'_> {
    fn backend_name(&self) -> String {
        format!("{:?}", self.adapter_info.backend).to_lowercase()
    }

    fn swapchain_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn supports_sample_count(&self, count: u32) -> bool {
        count == 1
            || self
                .adapter
                .get_texture_format_features(self.config.format)
                .flags
                .sample_count_supported(count)
    }

    fn resize(&mut self, width: u32, height: u32) {
        surface::apply_resize(
            &self.surface,
            &self.device,
            &mut self.config,
            &mut self.size,
            PhysicalSize::new(width, height),
        );
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, RendererError> {
        if desc.size == 0 || desc.size % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(RendererError::InvalidDescriptor(format!(
                "buffer `{}` size {} must be a non-zero multiple of {}",
                desc.label,
                desc.size,
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }

        let usage = match desc.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM,
        } | wgpu::BufferUsages::COPY_DST;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: desc.size,
            usage,
            mapped_at_creation: false,
        });
        Ok(self.resources.buffers.insert(buffer))
    }

    fn update_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        match self.resources.buffers.get(buffer) {
            Some(b) => self.queue.write_buffer(b, offset, data),
            None => log::warn!("update of destroyed buffer ignored"),
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        self.resources.buffers.remove(buffer);
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
        let multisampled = desc.sample_count > 1;
        if multisampled && !self.supports_sample_count(desc.sample_count) {
            return Err(RendererError::UnsupportedFeature(format!(
                "{}x multisampling on {:?}",
                desc.sample_count, self.config.format
            )));
        }

        let mip_levels = desc.mip_levels.max(1);
        let mut usage = wgpu::TextureUsages::empty();
        if desc.render_target || mip_levels > 1 {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }
        if !multisampled {
            usage |= wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        }

        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size,
            mip_level_count: mip_levels,
            sample_count: desc.sample_count.max(1),
            dimension: wgpu::TextureDimension::D2,
            format: self.texture_format(desc.format),
            usage,
            view_formats: &[],
        });

        if let Some(pixels) = pixels {
            let expected = desc.width as usize * desc.height as usize * 4;
            if pixels.len() != expected {
                return Err(RendererError::InvalidDescriptor(format!(
                    "image `{}` expects {expected} bytes of RGBA8, got {}",
                    desc.label,
                    pixels.len()
                )));
            }
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * desc.width),
                    rows_per_image: Some(desc.height),
                },
                size,
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let attachment_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(desc.label),
            base_mip_level: 0,
            mip_level_count: Some(1),
            ..Default::default()
        });
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(desc.label),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(self.resources.images.insert(GpuImage {
            texture,
            view,
            attachment_view,
            sampler,
        }))
    }

    fn destroy_image(&mut self, image: ImageId) {
        if let Some(image) = self.resources.images.remove(image) {
            image.texture.destroy();
        }
    }

    fn create_framebuffer(
        &mut self,
        desc: &FramebufferDesc,
    ) -> Result<FramebufferId, RendererError> {
        let color = self.resources.images.get(desc.color).ok_or_else(|| {
            RendererError::InvalidDescriptor("framebuffer color image is destroyed".into())
        })?;
        let sample_count = color.texture.sample_count();

        if let Some(resolve) = desc.resolve {
            let resolve = self.resources.images.get(resolve).ok_or_else(|| {
                RendererError::InvalidDescriptor("framebuffer resolve image is destroyed".into())
            })?;
            if sample_count == 1 || resolve.texture.sample_count() != 1 {
                return Err(RendererError::InvalidDescriptor(
                    "resolve needs a multisampled color image and a single-sample target".into(),
                ));
            }
        }

        Ok(self.resources.framebuffers.insert(GpuFramebuffer {
            color: desc.color,
            resolve: desc.resolve,
            sample_count,
        }))
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.resources.framebuffers.remove(framebuffer);
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineId, RendererError> {
        validate_wgsl(ShaderStage::Vertex, desc.vertex_source)?;
        validate_wgsl(ShaderStage::Fragment, desc.fragment_source)?;

        let vertex = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.label),
                source: wgpu::ShaderSource::Wgsl(desc.vertex_source.into()),
            });
        let fragment = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.label),
                source: wgpu::ShaderSource::Wgsl(desc.fragment_source.into()),
            });

        let mut entries = vec![
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];
        if let Some(uniforms) = desc.uniforms {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: shader_stages(uniforms.stage),
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(uniforms.size),
                },
                count: None,
            });
        }

        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(desc.label),
                    entries: &entries,
                });

        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

        let mut pipeline = GpuPipeline {
            label: desc.label.to_string(),
            vertex,
            fragment,
            layout,
            bind_group_layout,
            has_uniforms: desc.uniforms.is_some(),
            format: self.config.format,
            variants: HashMap::new(),
        };
        // Most batches target the single-sampled swapchain.
        pipeline.variant(&self.device, 1);

        Ok(self.resources.pipelines.insert(pipeline))
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineId) {
        self.resources.pipelines.remove(pipeline);
    }

    fn create_resource_set(
        &mut self,
        desc: &ResourceSetDesc,
    ) -> Result<ResourceSetId, RendererError> {
        let pipeline = self.resources.pipelines.get(desc.pipeline).ok_or_else(|| {
            RendererError::InvalidDescriptor("resource set pipeline is destroyed".into())
        })?;
        let image = self.resources.images.get(desc.image).ok_or_else(|| {
            RendererError::InvalidDescriptor("resource set image is destroyed".into())
        })?;

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&image.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&image.sampler),
            },
        ];
        match (pipeline.has_uniforms, desc.uniforms) {
            (true, Some(buffer)) => {
                let buffer = self.resources.buffers.get(buffer).ok_or_else(|| {
                    RendererError::InvalidDescriptor("resource set uniform buffer is destroyed".into())
                })?;
                entries.push(wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffer.as_entire_binding(),
                });
            }
            (false, None) => {}
            _ => {
                return Err(RendererError::InvalidDescriptor(format!(
                    "uniform buffer does not match the layout of pipeline `{}`",
                    pipeline.label
                )));
            }
        }

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&pipeline.label),
            layout: &pipeline.bind_group_layout,
            entries: &entries,
        });
        Ok(self.resources.resource_sets.insert(bind_group))
    }

    fn destroy_resource_set(&mut self, set: ResourceSetId) {
        self.resources.resource_sets.remove(set);
    }

    fn begin_commands(&mut self) -> Result<(), RendererError> {
        self.commands.begin();
        if self.frame.is_none() {
            self.acquire_frame()?;
        }
        Ok(())
    }

    fn set_framebuffer(&mut self, target: FramebufferTarget) {
        self.commands.push(Command::SetFramebuffer(target));
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(Command::Clear(color));
    }

    fn set_viewport(&mut self, viewport: ViewportRect) {
        self.commands.push(Command::SetViewport(viewport));
    }

    fn set_scissor(&mut self, scissor: ScissorRect) {
        self.commands.push(Command::SetScissor(scissor));
    }

    fn set_vertex_buffer(&mut self, buffer: BufferId) {
        self.commands.push(Command::SetVertexBuffer(buffer));
    }

    fn set_index_buffer(&mut self, buffer: BufferId) {
        self.commands.push(Command::SetIndexBuffer(buffer));
    }

    fn set_pipeline(&mut self, pipeline: PipelineId) {
        self.commands.push(Command::SetPipeline(pipeline));
    }

    fn set_resource_set(&mut self, set: ResourceSetId) {
        self.commands.push(Command::SetResourceSet(set));
    }

    fn draw_indexed(&mut self, index_count: u32, index_start: u32, base_vertex: i32) {
        self.commands.push(Command::DrawIndexed {
            index_count,
            index_start,
            base_vertex,
        });
    }

    fn generate_mipmaps(&mut self, image: ImageId) {
        self.commands.push(Command::GenerateMipmaps(image));
    }

    fn resolve(&mut self, framebuffer: FramebufferId) {
        self.commands.push(Command::Resolve(framebuffer));
    }

    fn end_commands(&mut self) {
        self.commands.end();
    }

    fn submit(&mut self) -> Result<(), RendererError> {
        let commands = self.commands.take();
        if commands.is_empty() {
            return Ok(());
        }

        let ctx = ReplayContext {
            device: &self.device,
            resources: &mut self.resources,
            mipmaps: &mut self.mipmaps,
            swapchain: self.frame.as_ref().map(|f| &f.view),
            srgb_targets: self.config.format.is_srgb(),
        };
        let buffer = replay::encode(ctx, &commands);
        self.queue.submit(std::iter::once(buffer));
        Ok(())
    }

    fn present(&mut self) -> Result<(), RendererError> {
        if let Some(frame) = self.frame.take() {
            self.window.pre_present_notify();
            drop(frame.view);
            frame.surface_texture.present();
        }
        Ok(())
    }
}
