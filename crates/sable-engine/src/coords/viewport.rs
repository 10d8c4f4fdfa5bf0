use super::Vec2;

/// Drawable size in pixels.
///
/// Used as the projection basis when converting pixel positions to clip space.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f32, height as f32)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    #[inline]
    pub fn size(self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Maps a pixel position (top-left origin, +Y down) to clip space
    /// (`[-1, 1]`, +Y up).
    ///
    /// Degenerate viewports are clamped to one pixel so the result stays finite.
    #[inline]
    pub fn project(self, p: Vec2) -> [f32; 2] {
        let w = self.width.max(1.0);
        let h = self.height.max(1.0);
        [p.x * 2.0 / w - 1.0, 1.0 - p.y * 2.0 / h]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_corners() {
        let vp = Viewport::new(800.0, 600.0);
        assert_eq!(vp.project(Vec2::ZERO), [-1.0, 1.0]);
        assert_eq!(vp.project(Vec2::new(800.0, 600.0)), [1.0, -1.0]);
        assert_eq!(vp.project(Vec2::new(400.0, 300.0)), [0.0, 0.0]);
    }

    #[test]
    fn zero_sized_viewport_is_invalid() {
        assert!(!Viewport::new(0.0, 10.0).is_valid());
        assert!(Viewport::new(1.0, 1.0).is_valid());
    }
}
