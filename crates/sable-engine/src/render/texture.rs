use slotmap::new_key_type;

use crate::coords::Vec2;
use crate::device::{GpuBackend, ImageDesc, ImageFormat, ImageId, RendererError};

new_key_type! {
    /// Handle to a texture owned by a [`super::Renderer`].
    pub struct TextureId;
}

/// Where a texture's pixels come from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureOrigin {
    Loaded,
    /// Color output of a render target; sampled with a backend-dependent v flip.
    RenderTarget,
}

/// Tightly packed RGBA8 pixels for a new texture.
#[derive(Debug, Clone)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub pixels: &'a [u8],
}

impl<'a> TextureDesc<'a> {
    pub fn rgba8(label: &'a str, width: u32, height: u32, pixels: &'a [u8]) -> Self {
        Self {
            label,
            width,
            height,
            mip_levels: 1,
            pixels,
        }
    }

    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    /// Asks for the longest chain the size allows.
    pub fn with_full_mip_chain(mut self) -> Self {
        self.mip_levels = max_mip_levels(self.width, self.height);
        self
    }
}

/// Number of levels down to 1x1.
pub fn max_mip_levels(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

pub(crate) fn validate_extent(
    label: &str,
    width: u32,
    height: u32,
    mip_levels: u32,
) -> Result<(), RendererError> {
    if width == 0 || height == 0 {
        return Err(RendererError::InvalidDescriptor(format!(
            "`{label}` has zero size ({width}x{height})"
        )));
    }
    let max = max_mip_levels(width, height);
    if mip_levels == 0 || mip_levels > max {
        return Err(RendererError::InvalidDescriptor(format!(
            "`{label}` asks for {mip_levels} mip levels; {width}x{height} allows 1..={max}"
        )));
    }
    Ok(())
}

#[derive(Debug)]
pub struct Texture {
    image: ImageId,
    width: u32,
    height: u32,
    mip_levels: u32,
    origin: TextureOrigin,
    mips_dirty: bool,
}

impl Texture {
    pub(crate) fn upload<B: GpuBackend>(
        backend: &mut B,
        desc: &TextureDesc<'_>,
    ) -> Result<Self, RendererError> {
        validate_extent(desc.label, desc.width, desc.height, desc.mip_levels)?;
        let expected = desc.width as usize * desc.height as usize * 4;
        if desc.pixels.len() != expected {
            return Err(RendererError::InvalidDescriptor(format!(
                "texture `{}` expects {expected} bytes of RGBA8, got {}",
                desc.label,
                desc.pixels.len()
            )));
        }

        let image = backend.create_image(
            &ImageDesc {
                label: desc.label,
                width: desc.width,
                height: desc.height,
                mip_levels: desc.mip_levels,
                sample_count: 1,
                format: ImageFormat::Rgba8,
                render_target: false,
            },
            Some(desc.pixels),
        )?;

        Ok(Self {
            image,
            width: desc.width,
            height: desc.height,
            mip_levels: desc.mip_levels,
            origin: TextureOrigin::Loaded,
            // Only level 0 was uploaded.
            mips_dirty: desc.mip_levels > 1,
        })
    }

    pub(crate) fn for_render_target(image: ImageId, width: u32, height: u32, mip_levels: u32) -> Self {
        Self {
            image,
            width,
            height,
            mip_levels,
            origin: TextureOrigin::RenderTarget,
            mips_dirty: false,
        }
    }

    pub(crate) fn destroy<B: GpuBackend>(self, backend: &mut B) {
        backend.destroy_image(self.image);
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

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn origin(&self) -> TextureOrigin {
        self.origin
    }

    pub fn image(&self) -> ImageId {
        self.image
    }

    /// Level 0 changed; lower levels are stale until regenerated.
    pub(crate) fn mark_written(&mut self) {
        if self.mip_levels > 1 {
            self.mips_dirty = true;
        }
    }

    pub(crate) fn take_mips_dirty(&mut self) -> bool {
        std::mem::take(&mut self.mips_dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_length() {
        assert_eq!(max_mip_levels(1, 1), 1);
        assert_eq!(max_mip_levels(256, 256), 9);
        assert_eq!(max_mip_levels(300, 20), 9);
    }

    #[test]
    fn extent_validation() {
        assert!(validate_extent("t", 4, 4, 3).is_ok());
        assert!(validate_extent("t", 4, 4, 4).is_err());
        assert!(validate_extent("t", 0, 4, 1).is_err());
        assert!(validate_extent("t", 4, 4, 0).is_err());
    }
}
