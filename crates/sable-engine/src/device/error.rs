use std::fmt;

use super::{GraphicsApi, ShaderStage};
use crate::render::UniformType;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Resource family named by handle errors.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceKind {
    Texture,
    Shader,
    RenderTarget,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Texture => "texture",
            ResourceKind::Shader => "shader",
            ResourceKind::RenderTarget => "render target",
        })
    }
}

/// Every failure the renderer and its backends report.
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("{api} is not available on {platform}")]
    UnsupportedPlatformCombination {
        api: GraphicsApi,
        platform: &'static str,
    },

    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(String),

    #[error("failed to create window surface: {0}")]
    SurfaceCreationFailed(String),

    #[error("{stage} shader failed to compile:\n{message}")]
    ShaderCompilation { stage: ShaderStage, message: String },

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("{kind} handle refers to a destroyed resource")]
    StaleResource { kind: ResourceKind },

    #[error("{kind} is still referenced by the current frame")]
    ResourceInUse { kind: ResourceKind },

    #[error("shader `{shader}` has no uniform named `{name}`")]
    UnknownUniform { shader: String, name: String },

    #[error("uniform `{name}` is declared as {expected:?} but was given {found:?}")]
    UniformTypeMismatch {
        name: String,
        expected: UniformType,
        found: UniformType,
    },

    #[error("invalid frame state: {0}")]
    FrameState(&'static str),

    #[error("surface presentation failed: {0}")]
    Presentation(String),
}
