//! Coordinate and geometry types shared by the renderer and applications.
//!
//! Canonical CPU space:
//! - pixels of the active render destination (window or render target)
//! - origin top-left
//! - +X right, +Y down
//!
//! Geometry is projected to clip space on the CPU before it reaches the GPU.

mod anchor;
mod rect;
mod vec2;
mod viewport;

pub use anchor::Anchor;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
