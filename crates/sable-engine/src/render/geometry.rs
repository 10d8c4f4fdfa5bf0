//! Pure shape math: corner positions, texture coordinates and tessellation
//! parameters. Positions are pixels (top-left origin, +Y down).

use std::f32::consts::FRAC_PI_2;

use crate::coords::{Anchor, Rect, Vec2};

/// Index pattern for quads emitted in [`rect_corners`] order.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Segments used for a circle when the caller does not pick a count.
///
/// Grows quadratically with the radius; never below 12.
pub fn circle_segments_for_radius(radius: f32) -> u32 {
    let steps = (radius / 50.0) as i64;
    let density = (radius / 50.0 * 2.5) as i64;
    (steps * density).max(12) as u32
}

/// Corners of a rectangle rotated by `rotation` radians about its `anchor`.
///
/// Order: top-left, bottom-left, bottom-right, top-right (before rotation).
pub fn rect_corners(pos: Vec2, size: Vec2, rotation: f32, anchor: Anchor) -> [Vec2; 4] {
    let corners = [
        pos,
        pos + size * Vec2::UNIT_Y,
        pos + size,
        pos + size * Vec2::UNIT_X,
    ];
    if rotation == 0.0 {
        return corners;
    }

    let pivot = anchor.point(pos, size);
    corners.map(|c| pivot + (c - pivot).rotated(rotation))
}

/// Normalized texture coordinates for a texel-space source rectangle, in
/// [`rect_corners`] order. `flip_v` maps v to `1 - v`.
pub fn quad_uvs(source: Rect, texture_size: Vec2, flip_v: bool) -> [[f32; 2]; 4] {
    let size = texture_size.max(Vec2::ONE);
    let p = source.origin / size;
    let s = source.size / size;
    [p, p + s * Vec2::UNIT_Y, p + s, p + s * Vec2::UNIT_X].map(|uv| {
        if flip_v {
            [uv.x, 1.0 - uv.y]
        } else {
            [uv.x, uv.y]
        }
    })
}

/// Unit direction of circle vertex `i` out of `segments`, starting at +X.
pub fn circle_direction(i: u32, segments: u32) -> Vec2 {
    let angle = (360.0 / segments as f32 * i as f32).to_radians();
    let (s, c) = angle.sin_cos();
    Vec2::new(c, s)
}

/// Rectangle equivalent of a line segment: `(pos, size, rotation)` for a
/// rectangle anchored at its top edge midpoint, which sits on `a`.
pub fn line_rect(a: Vec2, b: Vec2, thickness: f32) -> (Vec2, Vec2, f32) {
    let d = b - a;
    let rotation = d.y.atan2(d.x) - FRAC_PI_2;
    let pos = a - Vec2::new(thickness * 0.5, 0.0);
    (pos, Vec2::new(thickness, d.length()), rotation)
}

/// Cheap visibility test against the `[0, width] x [0, height]` render area.
pub fn is_visible(bounds: Rect, render_size: Vec2) -> bool {
    bounds.is_finite() && bounds.overlaps(Rect::from_origin_size(Vec2::ZERO, render_size))
}
