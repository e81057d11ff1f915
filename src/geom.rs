//! Planar primitives shared by every layer of the crate.
//!
//! `Point` doubles as a world coordinate, a CSS pixel and a source-image pixel
//! depending on which transform produced it. `Extent` is the world-space
//! bounding box used for spatial queries; an empty extent is represented by the
//! inverted sentinel box returned from [`Extent::empty`].

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use serde::{Deserialize, Serialize};

/// A point in world, view, device-pixel or image-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Width and height, in whatever unit the caller is working in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Scale both dimensions by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self { width: self.width * factor, height: self.height * factor }
    }
}

/// Axis-aligned bounding box in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Self::empty()
    }
}

impl Extent {
    #[must_use]
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// The empty extent. Extending it by any point yields that point's extent.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Degenerate extent covering exactly one point.
    #[must_use]
    pub fn from_point(p: Point) -> Self {
        Self { min_x: p.x, min_y: p.y, max_x: p.x, max_y: p.y }
    }

    /// Smallest extent containing every point in `points`. Empty for no points.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Self {
        let mut extent = Self::empty();
        for p in points {
            extent.extend_point(*p);
        }
        extent
    }

    /// Returns `true` for the sentinel (or any inverted) box.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.max_x < self.min_x || self.max_y < self.min_y
    }

    /// Grow in place so that `p` is covered.
    pub fn extend_point(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    /// Grow in place so that `other` is covered.
    pub fn extend(&mut self, other: &Extent) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Expand symmetrically by `value` in every direction.
    #[must_use]
    pub fn buffer(&self, value: f64) -> Self {
        Self {
            min_x: self.min_x - value,
            min_y: self.min_y - value,
            max_x: self.max_x + value,
            max_y: self.max_y + value,
        }
    }

    /// Inclusive box intersection test. Touching edges count as intersecting;
    /// an empty extent intersects nothing.
    #[must_use]
    pub fn intersects(&self, other: &Extent) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x <= other.max_x && self.max_x >= other.min_x && self.min_y <= other.max_y && self.max_y >= other.min_y
    }

    /// Inclusive point containment test.
    #[must_use]
    pub fn contains_point(&self, p: Point) -> bool {
        self.min_x <= p.x && p.x <= self.max_x && self.min_y <= p.y && p.y <= self.max_y
    }

    /// Returns `true` if `other` lies entirely inside this extent.
    #[must_use]
    pub fn contains_extent(&self, other: &Extent) -> bool {
        self.min_x <= other.min_x && other.max_x <= self.max_x && self.min_y <= other.min_y && other.max_y <= self.max_y
    }

    /// Overlap of the two extents, or [`Extent::empty`] when they are disjoint.
    #[must_use]
    pub fn intersection(&self, other: &Extent) -> Self {
        if !self.intersects(other) {
            return Self::empty();
        }
        Self {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    /// World extent visible through a viewport of `size` pixels centered on
    /// `center`, at `resolution` world units per pixel, rotated by `rotation`
    /// radians. The result bounds all four rotated corners.
    #[must_use]
    pub fn for_view_and_size(center: Point, resolution: f64, rotation: f64, size: Size) -> Self {
        let dx = resolution * size.width / 2.0;
        let dy = resolution * size.height / 2.0;
        let (sin, cos) = rotation.sin_cos();
        let x_cos = dx * cos;
        let x_sin = dx * sin;
        let y_cos = dy * cos;
        let y_sin = dy * sin;
        let corners = [
            Point::new(center.x - x_cos + y_sin, center.y - x_sin - y_cos),
            Point::new(center.x - x_cos - y_sin, center.y - x_sin + y_cos),
            Point::new(center.x + x_cos - y_sin, center.y + x_sin + y_cos),
            Point::new(center.x + x_cos + y_sin, center.y + x_sin - y_cos),
        ];
        Self::from_points(&corners)
    }
}
