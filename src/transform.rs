//! 2D affine transforms.
//!
//! A [`Transform`] stores the six coefficients `(a, b, c, d, e, f)` of
//!
//! ```text
//! x' = a·x + c·y + e
//! y' = b·x + d·y + f
//! ```
//!
//! The in-place builders (`scale`, `rotate`, `translate`, `multiply`) all
//! right-multiply: each new step is applied to the input *before* the steps
//! already accumulated. Reading a builder chain top to bottom therefore lists
//! the operations from outermost to innermost. The same convention is used by
//! the projection and hit-test builders in [`crate::pipeline`], which must be
//! exact inverses of one another.
//!
//! Renderers keep transforms as scratch buffers and mutate them in place each
//! frame; since `Transform` is `Copy`, callers that want a value can take a
//! copy instead of holding a reference across frames.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use std::ops::Mul;

use serde::{Deserialize, Serialize};

use crate::geom::Point;

/// Error returned when a transform cannot be inverted.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// The determinant is zero (or the inverse is not finite).
    #[error("transform is singular (determinant {determinant})")]
    Singular { determinant: f64 },
}

/// A 2D affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    #[must_use]
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    #[must_use]
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// Build `translate(dx1, dy1) ∘ scale(sx, sy) ∘ rotate(angle) ∘ translate(dx2, dy2)`
    /// in one step.
    #[must_use]
    pub fn compose(dx1: f64, dy1: f64, sx: f64, sy: f64, angle: f64, dx2: f64, dy2: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            a: sx * cos,
            b: sy * sin,
            c: -sx * sin,
            d: sy * cos,
            e: dx2 * sx * cos - dy2 * sx * sin + dx1,
            f: dx2 * sy * sin + dy2 * sy * cos + dy1,
        }
    }

    /// Reset to the identity.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::IDENTITY;
        self
    }

    /// Overwrite all six coefficients.
    pub fn set(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> &mut Self {
        *self = Self { a, b, c, d, e, f };
        self
    }

    /// `self = self ∘ other`: `other` is applied first, then the old `self`.
    pub fn multiply(&mut self, other: &Transform) -> &mut Self {
        let Transform { a: a1, b: b1, c: c1, d: d1, e: e1, f: f1 } = *self;
        let Transform { a: a2, b: b2, c: c2, d: d2, e: e2, f: f2 } = *other;
        self.a = a1 * a2 + c1 * b2;
        self.b = b1 * a2 + d1 * b2;
        self.c = a1 * c2 + c1 * d2;
        self.d = b1 * c2 + d1 * d2;
        self.e = a1 * e2 + c1 * f2 + e1;
        self.f = b1 * e2 + d1 * f2 + f1;
        self
    }

    pub fn scale(&mut self, sx: f64, sy: f64) -> &mut Self {
        self.multiply(&Transform::new(sx, 0.0, 0.0, sy, 0.0, 0.0))
    }

    /// Rotate counter-clockwise by `angle` radians.
    pub fn rotate(&mut self, angle: f64) -> &mut Self {
        let (sin, cos) = angle.sin_cos();
        self.multiply(&Transform::new(cos, sin, -sin, cos, 0.0, 0.0))
    }

    pub fn translate(&mut self, dx: f64, dy: f64) -> &mut Self {
        self.multiply(&Transform::new(1.0, 0.0, 0.0, 1.0, dx, dy))
    }

    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Invert in place.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Singular`] if the determinant is zero, too
    /// small to tell from rounding noise at the matrix's scale, or the
    /// inverse would not be finite. `self` is left untouched in that case.
    pub fn invert(&mut self) -> Result<&mut Self, TransformError> {
        *self = self.inverse()?;
        Ok(self)
    }

    /// Value-style inverse.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Singular`] under the same conditions as [`Transform::invert`].
    pub fn inverse(&self) -> Result<Transform, TransformError> {
        let det = self.determinant();
        let Transform { a, b, c, d, e, f } = *self;
        // Cancellation leaves a residue of a few ulps of the column magnitudes
        // when the columns are collinear.
        let noise = f64::EPSILON * (a.abs() + b.abs()) * (c.abs() + d.abs());
        if !det.is_finite() || det.abs() <= noise {
            return Err(TransformError::Singular { determinant: det });
        }
        let inv = Transform {
            a: d / det,
            b: -b / det,
            c: -c / det,
            d: a / det,
            e: (c * f - d * e) / det,
            f: -(a * f - b * e) / det,
        };
        if !inv.is_finite() {
            return Err(TransformError::Singular { determinant: det });
        }
        Ok(inv)
    }

    /// Map `p` through this transform.
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        Point { x: self.a * p.x + self.c * p.y + self.e, y: self.b * p.x + self.d * p.y + self.f }
    }

    /// Returns `true` if every coefficient is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        [self.a, self.b, self.c, self.d, self.e, self.f].iter().all(|v| v.is_finite())
    }

    /// Coefficient-wise comparison within `tolerance`.
    #[must_use]
    pub fn approx_eq(&self, other: &Transform, tolerance: f64) -> bool {
        (self.a - other.a).abs() <= tolerance
            && (self.b - other.b).abs() <= tolerance
            && (self.c - other.c).abs() <= tolerance
            && (self.d - other.d).abs() <= tolerance
            && (self.e - other.e).abs() <= tolerance
            && (self.f - other.f).abs() <= tolerance
    }
}

/// `lhs * rhs` is `lhs ∘ rhs`: `rhs` is applied first.
impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        let mut out = self;
        out.multiply(&rhs);
        out
    }
}
