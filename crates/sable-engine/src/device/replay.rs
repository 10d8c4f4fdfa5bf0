//! Turns the flat command list into wgpu render passes.
//!
//! A pass stays open across draws until the framebuffer changes, a clear is
//! requested, or work that needs the encoder (mip generation, resolves) arrives.

use super::gpu::GpuResources;
use super::mipmap::MipmapGenerator;
use super::{
    BufferId, FramebufferId, FramebufferTarget, ImageId, PipelineId, ResourceSetId, ScissorRect,
    ViewportRect,
};
use crate::paint::Color;

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum Command {
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
}

#[derive(Debug, Default)]
pub(crate) struct CommandList {
    commands: Vec<Command>,
    recording: bool,
}

impl CommandList {
    pub(crate) fn begin(&mut self) {
        self.recording = true;
    }

    pub(crate) fn end(&mut self) {
        self.recording = false;
    }

    pub(crate) fn push(&mut self, command: Command) {
        if !self.recording {
            log::warn!("{command:?} issued outside begin_commands/end_commands; ignored");
            return;
        }
        self.commands.push(command);
    }

    pub(crate) fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

#[derive(Debug, Default)]
struct Bindings {
    viewport: Option<ViewportRect>,
    scissor: Option<ScissorRect>,
    vertex: Option<BufferId>,
    index: Option<BufferId>,
    pipeline: Option<PipelineId>,
    resource_set: Option<ResourceSetId>,
}

pub(crate) struct ReplayContext<'a> {
    pub device: &'a wgpu::Device,
    pub resources: &'a mut GpuResources,
    pub mipmaps: &'a mut MipmapGenerator,
    /// `None` when the swapchain image could not be acquired this frame.
    pub swapchain: Option<&'a wgpu::TextureView>,
    pub srgb_targets: bool,
}

pub(crate) fn encode(ctx: ReplayContext<'_>, commands: &[Command]) -> wgpu::CommandBuffer {
    let ReplayContext {
        device,
        resources,
        mipmaps,
        swapchain,
        srgb_targets,
    } = ctx;

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("sable frame encoder"),
    });

    let mut target = FramebufferTarget::Swapchain;
    let mut bindings = Bindings::default();
    let mut pending_clear: Option<Color> = None;
    let mut pass: Option<wgpu::RenderPass<'static>> = None;

    for command in commands {
        match *command {
            Command::SetFramebuffer(next) => {
                if next != target {
                    pass = None;
                    if let Some(color) = pending_clear.take() {
                        clear_only(&mut encoder, resources, swapchain, target, color, srgb_targets);
                    }
                    target = next;
                }
            }
            Command::Clear(color) => {
                pass = None;
                pending_clear = Some(color);
            }
            Command::SetViewport(v) => bindings.viewport = Some(v),
            Command::SetScissor(s) => bindings.scissor = Some(s),
            Command::SetVertexBuffer(b) => bindings.vertex = Some(b),
            Command::SetIndexBuffer(b) => bindings.index = Some(b),
            Command::SetPipeline(p) => bindings.pipeline = Some(p),
            Command::SetResourceSet(s) => bindings.resource_set = Some(s),
            Command::DrawIndexed {
                index_count,
                index_start,
                base_vertex,
            } => {
                if pass.is_none() {
                    let load = load_op(pending_clear.take(), srgb_targets);
                    pass = begin_pass(&mut encoder, resources, swapchain, target, load);
                }
                // No pass means the swapchain image was skipped this frame.
                let Some(rpass) = pass.as_mut() else {
                    continue;
                };
                let sample_count = target_sample_count(resources, target);
                if !bind(rpass, device, resources, sample_count, &bindings) {
                    log::warn!("draw skipped: pipeline, resource set or buffers are not bound");
                    continue;
                }
                rpass.draw_indexed(index_start..index_start + index_count, base_vertex, 0..1);
            }
            Command::GenerateMipmaps(image) => {
                pass = None;
                if let Some(color) = pending_clear.take() {
                    clear_only(&mut encoder, resources, swapchain, target, color, srgb_targets);
                }
                if let Some(image) = resources.images.get(image) {
                    mipmaps.generate(device, &mut encoder, &image.texture);
                }
            }
            Command::Resolve(_) => {
                // Multisampled framebuffers carry their resolve image as the pass
                // resolve target, so closing the pass performs the resolve.
                pass = None;
                if let Some(color) = pending_clear.take() {
                    clear_only(&mut encoder, resources, swapchain, target, color, srgb_targets);
                }
            }
        }
    }

    drop(pass);
    if let Some(color) = pending_clear.take() {
        clear_only(&mut encoder, resources, swapchain, target, color, srgb_targets);
    }

    encoder.finish()
}

fn load_op(clear: Option<Color>, srgb_target: bool) -> wgpu::LoadOp<wgpu::Color> {
    match clear {
        Some(color) => wgpu::LoadOp::Clear(clear_value(color, srgb_target)),
        None => wgpu::LoadOp::Load,
    }
}

/// sRGB targets expect linear clear values.
fn clear_value(color: Color, srgb_target: bool) -> wgpu::Color {
    let [r, g, b, a] = color.to_f32_array();
    let channel = |c: f32| {
        let c = f64::from(c);
        if !srgb_target {
            c
        } else if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    wgpu::Color {
        r: channel(r),
        g: channel(g),
        b: channel(b),
        a: f64::from(a),
    }
}

fn target_sample_count(resources: &GpuResources, target: FramebufferTarget) -> u32 {
    match target {
        FramebufferTarget::Swapchain => 1,
        FramebufferTarget::Offscreen(id) => resources
            .framebuffers
            .get(id)
            .map_or(1, |fb| fb.sample_count),
    }
}

fn attachment_views<'a>(
    resources: &'a GpuResources,
    swapchain: Option<&'a wgpu::TextureView>,
    target: FramebufferTarget,
) -> Option<(&'a wgpu::TextureView, Option<&'a wgpu::TextureView>)> {
    match target {
        FramebufferTarget::Swapchain => swapchain.map(|view| (view, None)),
        FramebufferTarget::Offscreen(id) => {
            let framebuffer = resources.framebuffers.get(id)?;
            let color = &resources.images.get(framebuffer.color)?.attachment_view;
            let resolve = match framebuffer.resolve {
                Some(image) => Some(&resources.images.get(image)?.attachment_view),
                None => None,
            };
            Some((color, resolve))
        }
    }
}

fn begin_pass(
    encoder: &mut wgpu::CommandEncoder,
    resources: &GpuResources,
    swapchain: Option<&wgpu::TextureView>,
    target: FramebufferTarget,
    load: wgpu::LoadOp<wgpu::Color>,
) -> Option<wgpu::RenderPass<'static>> {
    let (view, resolve_target) = attachment_views(resources, swapchain, target)?;

    let pass = encoder
        .begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sable batch pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
        .forget_lifetime();

    Some(pass)
}

fn clear_only(
    encoder: &mut wgpu::CommandEncoder,
    resources: &GpuResources,
    swapchain: Option<&wgpu::TextureView>,
    target: FramebufferTarget,
    color: Color,
    srgb_target: bool,
) {
    let load = load_op(Some(color), srgb_target);
    drop(begin_pass(encoder, resources, swapchain, target, load));
}

fn bind(
    pass: &mut wgpu::RenderPass<'static>,
    device: &wgpu::Device,
    resources: &mut GpuResources,
    sample_count: u32,
    bindings: &Bindings,
) -> bool {
    let (Some(viewport), Some(scissor), Some(vertex), Some(index), Some(pipeline), Some(set)) = (
        bindings.viewport,
        bindings.scissor,
        bindings.vertex,
        bindings.index,
        bindings.pipeline,
        bindings.resource_set,
    ) else {
        return false;
    };

    let Some(pipeline) = resources.pipelines.get_mut(pipeline) else {
        return false;
    };
    let pipeline = pipeline.variant(device, sample_count);

    let (Some(bind_group), Some(vertex), Some(index)) = (
        resources.resource_sets.get(set),
        resources.buffers.get(vertex),
        resources.buffers.get(index),
    ) else {
        return false;
    };

    pass.set_viewport(
        viewport.x,
        viewport.y,
        viewport.width,
        viewport.height,
        0.0,
        1.0,
    );
    pass.set_scissor_rect(scissor.x, scissor.y, scissor.width, scissor.height);
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.set_vertex_buffer(0, vertex.slice(..));
    pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_value_linearizes_for_srgb_targets() {
        let c = clear_value(Color::rgb(255, 0, 128), true);
        assert!((c.r - 1.0).abs() < 1e-9);
        assert_eq!(c.g, 0.0);
        assert!(c.b < 0.25 && c.b > 0.2);

        let raw = clear_value(Color::rgb(255, 0, 128), false);
        assert!((raw.b - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn commands_outside_recording_are_dropped() {
        let mut list = CommandList::default();
        list.push(Command::Clear(Color::BLACK));
        assert!(list.take().is_empty());

        list.begin();
        list.push(Command::Clear(Color::BLACK));
        list.end();
        assert_eq!(list.take(), vec![Command::Clear(Color::BLACK)]);
    }
}
