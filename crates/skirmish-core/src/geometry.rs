//! Collision math: rectangles, segments and swept tests
//!
//! Everything here is a pure function of its inputs using plain `f32`
//! arithmetic, so both peers compute bit-identical results.
//!
//! Rectangles are axis-aligned and stored as a minimum corner plus a size.
//! The swept test works on the Minkowski difference `collider ⊖ mover`: the
//! two shapes overlap exactly when that difference contains the origin, and
//! the mover hits the collider when a ray from the origin along the relative
//! motion enters it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum (top-left) corner
    pub min: Vec2,
    /// Width and height, both non-negative
    pub size: Vec2,
}

impl Rect {
    /// Create a rectangle from its minimum corner and size
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    /// Create a rectangle from two corners
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        let min = a.min(b);
        Self {
            min,
            size: a.max(b) - min,
        }
    }

    /// Maximum (bottom-right) corner
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    /// Centre point
    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    /// The same rectangle moved by `offset`
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min: self.min + offset,
            size: self.size,
        }
    }

    /// True if `point` lies strictly inside (touching the boundary does not count)
    pub fn contains_strict(&self, point: Vec2) -> bool {
        let max = self.max();
        point.x > self.min.x && point.x < max.x && point.y > self.min.y && point.y < max.y
    }

    /// True if `point` lies inside or on the boundary
    pub fn contains(&self, point: Vec2) -> bool {
        let max = self.max();
        point.x >= self.min.x && point.x <= max.x && point.y >= self.min.y && point.y <= max.y
    }

    /// True if the interiors of the two rectangles intersect
    pub fn overlaps(&self, other: &Rect) -> bool {
        minkowski_difference(other, self).contains_strict(Vec2::ZERO)
    }

    /// The four edges with their outward normals: left, right, top, bottom
    pub fn edges(&self) -> [(Segment, Vec2); 4] {
        let min = self.min;
        let max = self.max();
        let top_right = Vec2::new(max.x, min.y);
        let bottom_left = Vec2::new(min.x, max.y);
        [
            (Segment::new(min, bottom_left), Vec2::NEG_X),
            (Segment::new(top_right, max), Vec2::X),
            (Segment::new(min, top_right), Vec2::NEG_Y),
            (Segment::new(bottom_left, max), Vec2::Y),
        ]
    }
}

/// A directed line segment
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    pub start: Vec2,
    pub end: Vec2,
}

impl Segment {
    pub const fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    /// Vector from start to end
    pub fn delta(&self) -> Vec2 {
        self.end - self.start
    }

    /// Point at `fraction` along the segment
    pub fn point_at(&self, fraction: f32) -> Vec2 {
        self.start + self.delta() * fraction
    }
}

/// Where a segment first touched a rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    /// Fraction along the segment, in [0, 1]
    pub fraction: f32,
    /// Contact point
    pub point: Vec2,
}

fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// True if `point` is within `radius` of `center` (boundary inclusive)
pub fn point_in_circle(point: Vec2, center: Vec2, radius: f32) -> bool {
    point.distance_squared(center) <= radius * radius
}

/// Intersection of two segments, as the fraction along `a`
///
/// Parallel and collinear segments never intersect.
pub fn segment_intersection(a: &Segment, b: &Segment) -> Option<f32> {
    let r = a.delta();
    let s = b.delta();
    let denom = cross(r, s);
    if denom == 0.0 {
        return None;
    }
    let qp = b.start - a.start;
    let t = cross(qp, s) / denom;
    let u = cross(qp, r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(t)
    } else {
        None
    }
}

/// Closest point where `segment` enters `rect`
///
/// A segment that starts strictly inside the rectangle hits at fraction 0.
pub fn segment_rect_intersection(segment: &Segment, rect: &Rect) -> Option<SegmentHit> {
    if rect.contains_strict(segment.start) {
        return Some(SegmentHit {
            fraction: 0.0,
            point: segment.start,
        });
    }
    rect.edges()
        .iter()
        .filter_map(|(edge, _)| segment_intersection(segment, edge))
        .fold(None, |best: Option<f32>, t| match best {
            Some(b) if b <= t => Some(b),
            _ => Some(t),
        })
        .map(|fraction| SegmentHit {
            fraction,
            point: segment.point_at(fraction),
        })
}

/// Minkowski difference `a ⊖ b`: every point `pa - pb`
///
/// The interiors of `a` and `b` overlap exactly when the result strictly
/// contains the origin.
pub fn minkowski_difference(a: &Rect, b: &Rect) -> Rect {
    Rect {
        min: a.min - b.max(),
        size: a.size + b.size,
    }
}

/// Closest point on the boundary of `rect` to the origin
///
/// For an overlap `collider ⊖ mover`, translating the mover by this vector
/// separates the two shapes with the smallest possible push.
pub fn closest_point_on_bounds_to_origin(rect: &Rect) -> Vec2 {
    let min = rect.min;
    let max = rect.max();
    let mut best_distance = min.x.abs();
    let mut best = Vec2::new(min.x, 0.0);
    if max.x.abs() < best_distance {
        best_distance = max.x.abs();
        best = Vec2::new(max.x, 0.0);
    }
    if max.y.abs() < best_distance {
        best_distance = max.y.abs();
        best = Vec2::new(0.0, max.y);
    }
    if min.y.abs() < best_distance {
        best = Vec2::new(0.0, min.y);
    }
    best
}

/// Fraction of `motion` a ray from the origin travels before entering `rect`
///
/// Only edges facing the ray are considered, so a mover resting against a
/// surface may slide along it or move away from it freely. Returns `None`
/// when the full motion is free.
pub fn ray_fraction(motion: Vec2, rect: &Rect) -> Option<f32> {
    let ray = Segment::new(Vec2::ZERO, motion);
    rect.edges()
        .iter()
        .filter(|(_, normal)| normal.dot(motion) < 0.0)
        .filter_map(|(edge, _)| segment_intersection(&ray, edge))
        .fold(None, |best: Option<f32>, t| match best {
            Some(b) if b <= t => Some(b),
            _ => Some(t),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_in_circle() {
        assert!(point_in_circle(Vec2::new(3.0, 4.0), Vec2::ZERO, 5.0));
        assert!(!point_in_circle(Vec2::new(3.0, 4.1), Vec2::ZERO, 5.0));
    }

    #[test]
    fn test_segment_intersection() {
        let a = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        let b = Segment::new(Vec2::new(4.0, -1.0), Vec2::new(4.0, 1.0));
        assert_eq!(segment_intersection(&a, &b), Some(0.4));

        let parallel = Segment::new(Vec2::new(0.0, 1.0), Vec2::new(10.0, 1.0));
        assert_eq!(segment_intersection(&a, &parallel), None);

        let short = Segment::new(Vec2::new(12.0, -1.0), Vec2::new(12.0, 1.0));
        assert_eq!(segment_intersection(&a, &short), None);
    }

    #[test]
    fn test_segment_rect_closest_edge() {
        let rect = Rect::new(4.0, -2.0, 2.0, 4.0);
        let seg = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        let hit = segment_rect_intersection(&seg, &rect).unwrap();
        assert_eq!(hit.fraction, 0.4);
        assert_eq!(hit.point, Vec2::new(4.0, 0.0));

        let miss = Segment::new(Vec2::new(0.0, 5.0), Vec2::new(10.0, 5.0));
        assert!(segment_rect_intersection(&miss, &rect).is_none());

        let inside = Segment::new(Vec2::new(5.0, 0.0), Vec2::new(10.0, 0.0));
        assert_eq!(segment_rect_intersection(&inside, &rect).unwrap().fraction, 0.0);
    }

    #[test]
    fn test_minkowski_overlap() {
        let a = Rect::new(0.0, 0.0, 2.0, 2.0);
        let b = Rect::new(1.0, 1.0, 2.0, 2.0);
        assert!(minkowski_difference(&a, &b).contains_strict(Vec2::ZERO));
        assert!(a.overlaps(&b));

        let touching = Rect::new(2.0, 0.0, 2.0, 2.0);
        assert!(!a.overlaps(&touching));
    }

    #[test]
    fn test_closest_point_separates() {
        let mover = Rect::new(0.0, 0.0, 2.0, 2.0);
        let collider = Rect::new(1.5, 0.0, 2.0, 2.0);
        let md = minkowski_difference(&collider, &mover);
        let push = closest_point_on_bounds_to_origin(&md);
        assert_eq!(push, Vec2::new(-0.5, 0.0));
        assert!(!mover.translated(push).overlaps(&collider));
    }

    #[test]
    fn test_ray_fraction() {
        let mover = Rect::new(0.0, 0.0, 1.0, 1.0);
        let wall = Rect::new(3.0, -5.0, 1.0, 10.0);
        let md = minkowski_difference(&wall, &mover);

        assert_eq!(ray_fraction(Vec2::new(4.0, 0.0), &md), Some(0.5));
        assert_eq!(ray_fraction(Vec2::new(1.0, 0.0), &md), None);
        assert_eq!(ray_fraction(Vec2::new(-4.0, 0.0), &md), None);
    }

    #[test]
    fn test_ray_fraction_resting_contact() {
        // Mover flush against the wall's left face.
        let mover = Rect::new(2.0, 0.0, 1.0, 1.0);
        let wall = Rect::new(3.0, -5.0, 1.0, 10.0);
        let md = minkowski_difference(&wall, &mover);

        assert_eq!(ray_fraction(Vec2::new(1.0, 0.0), &md), Some(0.0));
        assert_eq!(ray_fraction(Vec2::new(-1.0, 0.0), &md), None);
        assert_eq!(ray_fraction(Vec2::new(0.0, 3.0), &md), None);
    }
}
