use super::vertex::{INDEX_SIZE, Vertex};
use crate::device::RendererError;

/// Fixed-capacity CPU staging for one frame's geometry.
///
/// Both arrays are allocated once at their full capacity and written through
/// cursors; they never grow.
#[derive(Debug)]
pub struct StagingBuffers {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    vertex_cursor: usize,
    index_cursor: usize,
}

impl StagingBuffers {
    pub fn with_byte_capacity(vertex_bytes: u64, index_bytes: u64) -> Result<Self, RendererError> {
        let vertex_capacity = (vertex_bytes / Vertex::SIZE) as usize;
        let index_capacity = (index_bytes / INDEX_SIZE) as usize;
        // A single quad must fit, otherwise nothing can ever be drawn.
        if vertex_capacity < 4 || index_capacity < 6 {
            return Err(RendererError::InvalidDescriptor(format!(
                "staging capacity of {vertex_bytes} vertex bytes / {index_bytes} index bytes \
                 cannot hold a single quad"
            )));
        }
        Ok(Self {
            vertices: vec![Vertex::default(); vertex_capacity],
            indices: vec![0; index_capacity],
            vertex_cursor: 0,
            index_cursor: 0,
        })
    }

    pub fn vertex_capacity(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_capacity(&self) -> usize {
        self.indices.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_cursor
    }

    pub fn index_count(&self) -> usize {
        self.index_cursor
    }

    pub fn has_room(&self, vertices: usize, indices: usize) -> bool {
        self.vertex_cursor + vertices <= self.vertices.len()
            && self.index_cursor + indices <= self.indices.len()
    }

    /// Whether a shape of this size fits into empty buffers.
    pub fn can_ever_hold(&self, vertices: usize, indices: usize) -> bool {
        vertices <= self.vertices.len() && indices <= self.indices.len()
    }

    /// Callers check [`Self::has_room`] first.
    #[inline]
    pub fn push_vertex(&mut self, vertex: Vertex) {
        self.vertices[self.vertex_cursor] = vertex;
        self.vertex_cursor += 1;
    }

    #[inline]
    pub fn push_index(&mut self, index: u32) {
        self.indices[self.index_cursor] = index;
        self.index_cursor += 1;
    }

    pub fn vertices(&self, range: std::ops::Range<usize>) -> &[Vertex] {
        &self.vertices[range]
    }

    pub fn indices(&self, range: std::ops::Range<usize>) -> &[u32] {
        &self.indices[range]
    }

    pub fn reset(&mut self) {
        self.vertex_cursor = 0;
        self.index_cursor = 0;
    }
}
