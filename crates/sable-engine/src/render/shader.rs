use std::collections::HashMap;

use slotmap::new_key_type;

use super::texture::{Texture, TextureId};
use super::uniform::{UniformBlock, UniformDesc, UniformValue};
use crate::device::{
    BufferDesc, BufferId, BufferUsage, GpuBackend, PipelineDesc, PipelineId, RendererError,
    ResourceSetDesc, ResourceSetId, UniformBinding,
};

new_key_type! {
    /// Handle to a shader owned by a [`super::Renderer`].
    pub struct ShaderId;
}

pub const DEFAULT_VERTEX_SHADER: &str = include_str!("shaders/default.vert.wgsl");
pub const DEFAULT_FRAGMENT_SHADER: &str = include_str!("shaders/default.frag.wgsl");

/// Sources and uniforms of a custom shader.
///
/// A missing stage falls back to the built-in one. Uniform fields are laid out
/// in declaration order and bound at `@group(0) @binding(2)`.
#[derive(Debug, Clone, Default)]
pub struct ShaderDesc {
    pub label: String,
    pub vertex: Option<String>,
    pub fragment: Option<String>,
    pub uniforms: Vec<UniformDesc>,
}

impl ShaderDesc {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_vertex(mut self, source: impl Into<String>) -> Self {
        self.vertex = Some(source.into());
        self
    }

    pub fn with_fragment(mut self, source: impl Into<String>) -> Self {
        self.fragment = Some(source.into());
        self
    }

    pub fn with_uniform(mut self, uniform: UniformDesc) -> Self {
        self.uniforms.push(uniform);
        self
    }
}

#[derive(Debug)]
pub struct Shader {
    label: String,
    pipeline: PipelineId,
    uniforms: UniformBlock,
    uniform_buffer: Option<BufferId>,
    /// One resource set per texture drawn with this shader.
    resource_sets: HashMap<TextureId, ResourceSetId>,
}

impl Shader {
    pub(crate) fn create<B: GpuBackend>(
        backend: &mut B,
        desc: &ShaderDesc,
    ) -> Result<Self, RendererError> {
        let uniforms = UniformBlock::new(&desc.uniforms)?;
        let binding = uniforms.stage().map(|stage| UniformBinding {
            size: uniforms.size(),
            stage,
        });

        let pipeline = backend.create_pipeline(&PipelineDesc {
            label: &desc.label,
            vertex_source: desc.vertex.as_deref().unwrap_or(DEFAULT_VERTEX_SHADER),
            fragment_source: desc.fragment.as_deref().unwrap_or(DEFAULT_FRAGMENT_SHADER),
            uniforms: binding,
        })?;

        let uniform_buffer = match binding {
            Some(binding) => {
                let buffer = backend.create_buffer(&BufferDesc {
                    label: &desc.label,
                    size: binding.size,
                    usage: BufferUsage::Uniform,
                });
                match buffer {
                    Ok(b) => Some(b),
                    Err(e) => {
                        backend.destroy_pipeline(pipeline);
                        return Err(e);
                    }
                }
            }
            None => None,
        };

        Ok(Self {
            label: desc.label.clone(),
            pipeline,
            uniforms,
            uniform_buffer,
            resource_sets: HashMap::new(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pipeline(&self) -> PipelineId {
        self.pipeline
    }

    pub fn uniforms(&self) -> &UniformBlock {
        &self.uniforms
    }

    pub(crate) fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), RendererError> {
        if self.uniforms.set(name, value)? {
            Ok(())
        } else {
            Err(RendererError::UnknownUniform {
                shader: self.label.clone(),
                name: name.to_string(),
            })
        }
    }

    /// Resource set binding `texture` (and the uniform buffer), created on first use.
    pub(crate) fn resource_set_for<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        texture_id: TextureId,
        texture: &Texture,
    ) -> Result<ResourceSetId, RendererError> {
        if let Some(set) = self.resource_sets.get(&texture_id) {
            return Ok(*set);
        }
        let set = backend.create_resource_set(&ResourceSetDesc {
            pipeline: self.pipeline,
            image: texture.image(),
            uniforms: self.uniform_buffer,
        })?;
        self.resource_sets.insert(texture_id, set);
        Ok(set)
    }

    /// Uploads the uniform block if it changed since the last upload.
    pub(crate) fn flush_uniforms<B: GpuBackend>(&mut self, backend: &mut B) {
        let Some(buffer) = self.uniform_buffer else {
            return;
        };
        if let Some(bytes) = self.uniforms.take_dirty() {
            backend.update_buffer(buffer, 0, bytes);
        }
    }

    pub(crate) fn forget_texture<B: GpuBackend>(&mut self, backend: &mut B, texture_id: TextureId) {
        if let Some(set) = self.resource_sets.remove(&texture_id) {
            backend.destroy_resource_set(set);
        }
    }

    pub(crate) fn destroy<B: GpuBackend>(self, backend: &mut B) {
        for set in self.resource_sets.into_values() {
            backend.destroy_resource_set(set);
        }
        if let Some(buffer) = self.uniform_buffer {
            backend.destroy_buffer(buffer);
        }
        backend.destroy_pipeline(self.pipeline);
    }
}
