// Shape geometry - bounding boxes and tessellation
//
// All coordinates are pixels with the origin at the bottom-left corner of the
// window and y pointing up. Shapes are tessellated into plain triangle lists
// of local vertices; the scene adds a translation on top.

use glam::Vec2;
use std::f32::consts::TAU;

/// Axis-aligned bounding box.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest box containing every point. Empty input gives a zero rect.
    pub fn from_points(points: &[Vec2]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };

        let (min, max) = points
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));

        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    pub fn translated(&self, offset: Vec2) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    /// Bounding-box overlap test. Edges are inclusive, so boxes that only
    /// touch still collide.
    pub fn intersects(&self, other: &Rect) -> bool {
        let x_overlap = self.x <= other.x + other.width && other.x <= self.x + self.width;
        let y_overlap = self.y <= other.y + other.height && other.y <= self.y + self.height;
        x_overlap && y_overlap
    }

    /// Whether `other` lies completely inside this box (edges inclusive).
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }
}

/// Two triangles covering `[0, w] x [0, h]`.
pub fn rectangle_vertices(width: f32, height: f32) -> Vec<Vec2> {
    vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(width, 0.0),
        Vec2::new(width, height),
        Vec2::new(0.0, 0.0),
        Vec2::new(0.0, height),
        Vec2::new(width, height),
    ]
}

pub fn triangle_vertices(a: Vec2, b: Vec2, c: Vec2) -> Vec<Vec2> {
    vec![a, b, c]
}

const MIN_CIRCLE_SEGMENTS: usize = 8;
const MAX_CIRCLE_SEGMENTS: usize = 256;
/// Pixels of circumference covered by one segment.
const CIRCLE_SEGMENT_LENGTH: f32 = 4.0;

/// Number of outer edges used to approximate a circle of `radius` pixels.
pub fn circle_segments(radius: f32) -> usize {
    let circumference = TAU * radius.max(0.0);
    let segments = (circumference / CIRCLE_SEGMENT_LENGTH).ceil() as usize;
    segments.clamp(MIN_CIRCLE_SEGMENTS, MAX_CIRCLE_SEGMENTS)
}

/// Triangle fan around the origin, flattened into a triangle list.
pub fn circle_vertices(radius: f32) -> Vec<Vec2> {
    let sides = circle_segments(radius);

    let rim: Vec<Vec2> = (0..sides)
        .map(|i| {
            let theta = TAU * i as f32 / sides as f32;
            Vec2::new(radius * theta.cos(), radius * theta.sin())
        })
        .collect();

    let mut vertices = Vec::with_capacity(sides * 3);
    for i in 0..sides {
        vertices.push(rim[i]);
        vertices.push(rim[(i + 1) % sides]);
        vertices.push(Vec2::ZERO);
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::new(x, y, w, h)
    }

    #[test]
    fn from_points_spans_all_points() {
        let rect = Rect::from_points(&[
            Vec2::new(920.0, 1020.0),
            Vec2::new(850.0, 960.0),
            Vec2::new(940.0, 980.0),
        ]);
        assert_eq!(rect, r(850.0, 960.0, 90.0, 60.0));
    }

    #[test]
    fn from_points_empty_is_zero() {
        assert_eq!(Rect::from_points(&[]), Rect::default());
    }

    #[test]
    fn intersects_overlapping() {
        assert!(r(0.0, 0.0, 10.0, 10.0).intersects(&r(5.0, 5.0, 10.0, 10.0)));
    }

    #[test]
    fn intersects_touching_edges_collide() {
        let a = r(0.0, 0.0, 10.0, 10.0);
        let b = r(10.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn intersects_contained() {
        assert!(r(0.0, 0.0, 100.0, 100.0).intersects(&r(10.0, 10.0, 5.0, 5.0)));
        assert!(r(10.0, 10.0, 5.0, 5.0).intersects(&r(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn intersects_disjoint_on_one_axis() {
        assert!(!r(0.0, 0.0, 10.0, 10.0).intersects(&r(20.0, 0.0, 5.0, 5.0)));
        assert!(!r(0.0, 0.0, 10.0, 10.0).intersects(&r(0.0, 11.0, 5.0, 5.0)));
    }

    #[test]
    fn contains_rect_is_edge_inclusive() {
        let outer = r(0.0, 0.0, 16.0, 20.0);
        assert!(outer.contains_rect(&r(0.0, 0.0, 16.0, 20.0)));
        assert!(outer.contains_rect(&r(12.0, 4.0, 4.0, 12.0)));
        assert!(!outer.contains_rect(&r(13.0, 4.0, 4.0, 12.0)));
        assert!(!outer.contains_rect(&r(-1.0, 0.0, 4.0, 4.0)));
    }

    #[test]
    fn rectangle_is_two_triangles() {
        let v = rectangle_vertices(20.0, 120.0);
        assert_eq!(v.len(), 6);
        assert_eq!(Rect::from_points(&v), r(0.0, 0.0, 20.0, 120.0));
    }

    #[test]
    fn circle_segments_are_clamped() {
        assert_eq!(circle_segments(0.5), MIN_CIRCLE_SEGMENTS);
        assert_eq!(circle_segments(10_000.0), MAX_CIRCLE_SEGMENTS);
        // 2 * pi * 10 / 4 = 15.7 -> 16
        assert_eq!(circle_segments(10.0), 16);
    }

    #[test]
    fn circle_fan_stays_within_radius() {
        let radius = 10.0;
        let v = circle_vertices(radius);
        assert_eq!(v.len(), circle_segments(radius) * 3);
        assert!(v.iter().all(|p| p.length() <= radius + 1e-4));

        // Every third vertex is the center.
        assert!(v.iter().skip(2).step_by(3).all(|p| *p == Vec2::ZERO));

        let bounds = Rect::from_points(&v);
        assert!((bounds.x + radius).abs() < 1e-3);
        assert!((bounds.width - 2.0 * radius).abs() < 1e-3);
    }
}
