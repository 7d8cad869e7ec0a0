//! Planar geometry primitives.
//!
//! Coordinates are projected (metric) map coordinates; the CRS is carried by
//! configuration and never interpreted here.

use core::fmt;

/// A 2D point in projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point at parameter `t` on the segment `self -> other`.
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Snapping key: coordinates rounded to multiples of `tolerance`.
    ///
    /// Two points with the same key are the same network node.
    pub fn key(&self, tolerance: f64) -> NodeKey {
        let tol = if tolerance > 0.0 { tolerance } else { 1e-9 };
        NodeKey {
            ix: (self.x / tol).round() as i64,
            iy: (self.y / tol).round() as i64,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Snapped integer coordinate pair identifying a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeKey {
    pub ix: i64,
    pub iy: i64,
}

/// Orthogonal projection of a point onto a line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Closest point on the segment.
    pub point: Point,
    /// Linear position along the segment in [0, 1].
    pub t: f64,
    /// Distance from the projected point to the original point.
    pub distance: f64,
}

/// Project `p` onto segment `a -> b`, clamping to the segment ends.
pub fn project_onto_segment(p: &Point, a: &Point, b: &Point) -> SegmentProjection {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    let t = if len2 <= f64::EPSILON {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
    };
    let point = a.lerp(b, t);
    SegmentProjection {
        point,
        t,
        distance: point.distance(p),
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    /// Bounding box of a set of points; `None` if the iterator is empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = BBox {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in iter {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox)
    }

    /// Grow the box by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Conservative overlap test between the box and the segment's own box.
    pub fn overlaps_segment(&self, a: &Point, b: &Point) -> bool {
        a.x.max(b.x) >= self.min_x
            && a.x.min(b.x) <= self.max_x
            && a.y.max(b.y) >= self.min_y
            && a.y.min(b.y) <= self.max_y
    }
}
