use super::Vec2;

/// Pivot a shape is rotated around, relative to its bounds.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Anchor {
    #[default]
    TopLeft,
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Anchor {
    /// Normalized position inside the unit square (`0..=1` on both axes).
    #[inline]
    pub const fn factor(self) -> Vec2 {
        match self {
            Anchor::TopLeft => Vec2::new(0.0, 0.0),
            Anchor::Top => Vec2::new(0.5, 0.0),
            Anchor::TopRight => Vec2::new(1.0, 0.0),
            Anchor::Left => Vec2::new(0.0, 0.5),
            Anchor::Center => Vec2::new(0.5, 0.5),
            Anchor::Right => Vec2::new(1.0, 0.5),
            Anchor::BottomLeft => Vec2::new(0.0, 1.0),
            Anchor::Bottom => Vec2::new(0.5, 1.0),
            Anchor::BottomRight => Vec2::new(1.0, 1.0),
        }
    }

    /// Absolute pivot point for a rectangle at `pos` with `size`.
    #[inline]
    pub fn point(self, pos: Vec2, size: Vec2) -> Vec2 {
        pos + self.factor() * size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_top_left() {
        assert_eq!(Anchor::default(), Anchor::TopLeft);
    }

    #[test]
    fn center_point_is_midpoint() {
        let p = Anchor::Center.point(Vec2::new(10.0, 20.0), Vec2::new(4.0, 8.0));
        assert_eq!(p, Vec2::new(12.0, 24.0));
    }

    #[test]
    fn bottom_right_point_is_max_corner() {
        let p = Anchor::BottomRight.point(Vec2::new(1.0, 1.0), Vec2::new(2.0, 3.0));
        assert_eq!(p, Vec2::new(3.0, 4.0));
    }
}
