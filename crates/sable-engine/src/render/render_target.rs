use slotmap::new_key_type;

use super::texture::{Texture, TextureId, validate_extent};
use crate::coords::Vec2;
use crate::device::{
    FramebufferDesc, FramebufferId, GpuBackend, ImageDesc, ImageFormat, ImageId, RendererError,
};

new_key_type! {
    /// Handle to an offscreen render target owned by a [`super::Renderer`].
    pub struct RenderTargetId;
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum SampleCount {
    #[default]
    X1,
    X2,
    X4,
    X8,
    X16,
}

impl SampleCount {
    pub fn count(self) -> u32 {
        match self {
            SampleCount::X1 => 1,
            SampleCount::X2 => 2,
            SampleCount::X4 => 4,
            SampleCount::X8 => 8,
            SampleCount::X16 => 16,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderTargetDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub sample_count: SampleCount,
    pub mip_levels: u32,
}

impl<'a> RenderTargetDesc<'a> {
    pub fn new(label: &'a str, width: u32, height: u32) -> Self {
        Self {
            label,
            width,
            height,
            sample_count: SampleCount::X1,
            mip_levels: 1,
        }
    }

    pub fn with_sample_count(mut self, sample_count: SampleCount) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }
}

/// Offscreen framebuffer whose color output is sampleable as a texture.
///
/// Multisampled targets render into a separate attachment image and resolve
/// into the sampleable texture after each draw.
#[derive(Debug)]
pub struct RenderTarget {
    framebuffer: FramebufferId,
    /// Multisampled attachment; `None` when rendering straight into the texture.
    msaa_image: Option<ImageId>,
    texture: TextureId,
    width: u32,
    height: u32,
    sample_count: SampleCount,
}

impl RenderTarget {
    /// Builds the images and framebuffer; `register` stores the sampleable
    /// texture and returns its handle.
    pub(crate) fn create<B: GpuBackend>(
        backend: &mut B,
        desc: &RenderTargetDesc<'_>,
        register: impl FnOnce(Texture) -> TextureId,
    ) -> Result<Self, RendererError> {
        validate_extent(desc.label, desc.width, desc.height, desc.mip_levels)?;
        let samples = desc.sample_count.count();
        if !backend.supports_sample_count(samples) {
            return Err(RendererError::UnsupportedFeature(format!(
                "render target `{}` asks for {samples}x multisampling",
                desc.label
            )));
        }

        let resolved = backend.create_image(
            &ImageDesc {
                label: desc.label,
                width: desc.width,
                height: desc.height,
                mip_levels: desc.mip_levels,
                sample_count: 1,
                format: ImageFormat::Target,
                render_target: true,
            },
            None,
        )?;

        let msaa_image = if samples > 1 {
            let msaa = backend.create_image(
                &ImageDesc {
                    label: desc.label,
                    width: desc.width,
                    height: desc.height,
                    mip_levels: 1,
                    sample_count: samples,
                    format: ImageFormat::Target,
                    render_target: true,
                },
                None,
            );
            match msaa {
                Ok(image) => Some(image),
                Err(e) => {
                    backend.destroy_image(resolved);
                    return Err(e);
                }
            }
        } else {
            None
        };

        let framebuffer = backend.create_framebuffer(&match msaa_image {
            Some(color) => FramebufferDesc {
                color,
                resolve: Some(resolved),
            },
            None => FramebufferDesc {
                color: resolved,
                resolve: None,
            },
        });
        let framebuffer = match framebuffer {
            Ok(fb) => fb,
            Err(e) => {
                if let Some(image) = msaa_image {
                    backend.destroy_image(image);
                }
                backend.destroy_image(resolved);
                return Err(e);
            }
        };

        let texture = register(Texture::for_render_target(
            resolved,
            desc.width,
            desc.height,
            desc.mip_levels,
        ));

        Ok(Self {
            framebuffer,
            msaa_image,
            texture,
            width: desc.width,
            height: desc.height,
            sample_count: desc.sample_count,
        })
    }

    /// Releases the framebuffer and multisample attachment. The resolved
    /// texture is released by its owner.
    pub(crate) fn destroy<B: GpuBackend>(self, backend: &mut B) {
        backend.destroy_framebuffer(self.framebuffer);
        if let Some(image) = self.msaa_image {
            backend.destroy_image(image);
        }
    }

    /// Copies multisampled output into the sampleable texture.
    pub(crate) fn resolve<B: GpuBackend>(&self, backend: &mut B) {
        if self.is_multisampled() {
            backend.resolve(self.framebuffer);
        }
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn sample_count(&self) -> SampleCount {
        self.sample_count
    }

    pub fn is_multisampled(&self) -> bool {
        self.msaa_image.is_some()
    }
}
