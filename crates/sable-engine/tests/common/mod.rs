#![allow(dead_code)]

use sable_engine::device::{BufferId, BufferUsage, GpuCall, RecordingBackend};
use sable_engine::render::{Renderer, RendererConfig, TextureDesc, TextureId, Vertex};

pub const WIDTH: u32 = 100;
pub const HEIGHT: u32 = 100;

/// Renderer on a 100x100 recording backend with room for `vertices` vertices
/// and `indices` indices.
pub fn renderer_with_capacity(vertices: u64, indices: u64) -> Renderer<RecordingBackend> {
    renderer_on(RecordingBackend::new(WIDTH, HEIGHT), vertices, indices)
}

pub fn renderer_on(
    backend: RecordingBackend,
    vertices: u64,
    indices: u64,
) -> Renderer<RecordingBackend> {
    let config = RendererConfig::default()
        .with_label("test")
        .with_capacity(vertices * Vertex::SIZE, indices * 4);
    match Renderer::new(backend, config) {
        Ok(r) => r,
        Err(e) => panic!("renderer creation failed: {e}"),
    }
}

pub fn renderer() -> Renderer<RecordingBackend> {
    renderer_with_capacity(1024, 1536)
}

pub fn solid_texture(renderer: &mut Renderer<RecordingBackend>, label: &str) -> TextureId {
    let pixels = [255u8; 2 * 2 * 4];
    renderer
        .create_texture(&TextureDesc::rgba8(label, 2, 2, &pixels))
        .expect("texture")
}

fn buffer_with_usage(backend: &RecordingBackend, usage: BufferUsage) -> BufferId {
    backend
        .calls()
        .iter()
        .find_map(|c| match c {
            GpuCall::CreateBuffer { id, usage: u, .. } if *u == usage => Some(*id),
            _ => None,
        })
        .expect("buffer was created")
}

/// The first `count` vertices of the GPU vertex buffer.
pub fn uploaded_vertices(backend: &RecordingBackend, count: usize) -> Vec<Vertex> {
    let id = buffer_with_usage(backend, BufferUsage::Vertex);
    let bytes = backend.buffer_contents(id).expect("vertex buffer");
    bytes[..count * Vertex::SIZE as usize]
        .chunks_exact(Vertex::SIZE as usize)
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

/// The first `count` indices of the GPU index buffer.
pub fn uploaded_indices(backend: &RecordingBackend, count: usize) -> Vec<u32> {
    let id = buffer_with_usage(backend, BufferUsage::Index);
    let bytes = backend.buffer_contents(id).expect("index buffer");
    bytes[..count * 4]
        .chunks_exact(4)
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

pub fn position_of(call: &GpuCall, calls: &[GpuCall]) -> usize {
    calls.iter().position(|c| c == call).expect("call was recorded")
}
