use bytemuck::{Pod, Zeroable};

/// One staged vertex: clip-space position, texture coordinate and packed RGBA8 color.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: u32,
}

impl Vertex {
    pub const SIZE: u64 = std::mem::size_of::<Vertex>() as u64;

    const ATTRS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Uint32];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

pub const INDEX_SIZE: u64 = std::mem::size_of::<u32>() as u64;
