//! Collision primitives - stateless geometry shared by every resolver

use serde::{Deserialize, Serialize};

/// Play-field width in world units
pub const FIELD_WIDTH: f32 = 800.0;
/// Play-field height in world units
pub const FIELD_HEIGHT: f32 = 600.0;

/// A position on the play field
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Point `distance` units away along `heading` (radians)
    pub fn offset(self, heading: f32, distance: f32) -> Self {
        Self {
            x: self.x + heading.cos() * distance,
            y: self.y + heading.sin() * distance,
        }
    }

    pub fn distance_sq(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

/// True iff the centers of `a` and `b` are closer than `threshold`.
///
/// Compares squared distances so the hot path never takes a square root.
pub fn overlaps(a: Point, b: Point, threshold: f32) -> bool {
    a.distance_sq(b) < threshold * threshold
}

/// Squared distance from `p` to the closest point of segment `start..end`
pub fn segment_distance_sq(start: Point, end: Point, p: Point) -> f32 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return start.distance_sq(p);
    }
    let t = (((p.x - start.x) * dx + (p.y - start.y) * dy) / len_sq).clamp(0.0, 1.0);
    Point::new(start.x + t * dx, start.y + t * dy).distance_sq(p)
}

/// True iff a point travelling from `start` to `end` comes closer than
/// `threshold` to `center` at any point along the way.
pub fn sweep_overlaps(start: Point, end: Point, center: Point, threshold: f32) -> bool {
    segment_distance_sq(start, end, center) < threshold * threshold
}

/// True iff the point lies strictly inside the play field
pub fn in_bounds(p: Point) -> bool {
    p.x > 0.0 && p.x < FIELD_WIDTH && p.y > 0.0 && p.y < FIELD_HEIGHT
}

/// Clamp a point onto the closed play field `[0,W]×[0,H]`
pub fn clamp_to_field(p: Point) -> Point {
    Point {
        x: p.x.clamp(0.0, FIELD_WIDTH),
        y: p.y.clamp(0.0, FIELD_HEIGHT),
    }
}
