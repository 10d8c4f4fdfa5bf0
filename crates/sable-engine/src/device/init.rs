use std::fmt;
use std::str::FromStr;

use super::RendererError;

/// Graphics API requested for a window's device.
///
/// `Default` lets wgpu pick the primary backend for the platform.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum GraphicsApi {
    #[default]
    Default,
    Vulkan,
    Metal,
    Dx12,
    OpenGl,
}

impl GraphicsApi {
    pub(crate) fn backends(self) -> wgpu::Backends {
        match self {
            GraphicsApi::Default => wgpu::Backends::PRIMARY,
            GraphicsApi::Vulkan => wgpu::Backends::VULKAN,
            GraphicsApi::Metal => wgpu::Backends::METAL,
            GraphicsApi::Dx12 => wgpu::Backends::DX12,
            GraphicsApi::OpenGl => wgpu::Backends::GL,
        }
    }

    /// Whether this API can exist at all on the compile target.
    pub fn is_available_on_target(self) -> bool {
        match self {
            GraphicsApi::Default | GraphicsApi::Vulkan => true,
            GraphicsApi::Metal => cfg!(any(target_os = "macos", target_os = "ios")),
            GraphicsApi::Dx12 => cfg!(target_os = "windows"),
            GraphicsApi::OpenGl => !cfg!(any(target_os = "macos", target_os = "ios")),
        }
    }

    /// Rejects API/platform pairs that can never produce a device.
    pub fn check_platform(self) -> Result<(), RendererError> {
        if self.is_available_on_target() {
            Ok(())
        } else {
            Err(RendererError::UnsupportedPlatformCombination {
                api: self,
                platform: std::env::consts::OS,
            })
        }
    }
}

impl fmt::Display for GraphicsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GraphicsApi::Default => "default",
            GraphicsApi::Vulkan => "vulkan",
            GraphicsApi::Metal => "metal",
            GraphicsApi::Dx12 => "dx12",
            GraphicsApi::OpenGl => "opengl",
        })
    }
}

impl FromStr for GraphicsApi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "default" | "auto" => Ok(GraphicsApi::Default),
            "vulkan" | "vk" => Ok(GraphicsApi::Vulkan),
            "metal" => Ok(GraphicsApi::Metal),
            "dx12" | "d3d12" | "direct3d12" => Ok(GraphicsApi::Dx12),
            "opengl" | "gl" | "gles" => Ok(GraphicsApi::OpenGl),
            other => Err(format!("unknown graphics api `{other}`")),
        }
    }
}

/// Initialization parameters for the GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Backend family used to create the instance.
    pub api: GraphicsApi,

    /// Prefer an sRGB surface format when available.
    ///
    /// Vertex colors are authored in sRGB and linearized in the default shader.
    pub prefer_srgb: bool,

    /// Wait for vertical blank before presenting.
    pub vsync: bool,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface.
    ///
    /// This value is a hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            api: GraphicsApi::Default,
            prefer_srgb: true,
            vsync: true,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

impl GpuInit {
    pub fn with_api(mut self, api: GraphicsApi) -> Self {
        self.api = api;
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_api_names() {
        assert_eq!("Vulkan".parse::<GraphicsApi>(), Ok(GraphicsApi::Vulkan));
        assert_eq!("d3d12".parse::<GraphicsApi>(), Ok(GraphicsApi::Dx12));
        assert_eq!("".parse::<GraphicsApi>(), Ok(GraphicsApi::Default));
        assert!("glide".parse::<GraphicsApi>().is_err());
    }

    #[test]
    fn default_and_vulkan_pass_platform_check() {
        assert!(GraphicsApi::Default.check_platform().is_ok());
        assert!(GraphicsApi::Vulkan.check_platform().is_ok());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn platform_exclusive_apis_are_rejected_on_linux() {
        for api in [GraphicsApi::Metal, GraphicsApi::Dx12] {
            match api.check_platform() {
                Err(RendererError::UnsupportedPlatformCombination { api: got, platform }) => {
                    assert_eq!(got, api);
                    assert_eq!(platform, "linux");
                }
                other => panic!("expected platform rejection, got {other:?}"),
            }
        }
    }
}
