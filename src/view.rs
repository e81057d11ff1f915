//! View and frame state supplied by the host each frame.
//!
//! [`ViewState`] is the camera: where the map is centered, how many world
//! units one pixel covers, and how far the map is rotated. [`FrameState`]
//! adds the viewport size and device pixel ratio for the frame being drawn and
//! derives the conversions between world coordinates and CSS pixels.

#[cfg(test)]
#[path = "view_test.rs"]
mod view_test;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_PROJECTION_CODE;
use crate::geom::{Extent, Point, Size};
use crate::transform::{Transform, TransformError};

/// Opaque projection identifier, e.g. `"EPSG:3857"`.
///
/// Projection math lives with the host; the core only forwards the code to
/// sources so they can fetch data in the right reference system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projection {
    code: String,
}

impl Projection {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::new(DEFAULT_PROJECTION_CODE)
    }
}

/// Camera state for one frame.
///
/// `resolution` is in world units per CSS pixel. `rotation` is in radians,
/// counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub center: Point,
    pub resolution: f64,
    pub rotation: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self { center: Point::default(), resolution: 1.0, rotation: 0.0 }
    }
}

impl ViewState {
    #[must_use]
    pub fn new(center: Point, resolution: f64, rotation: f64) -> Self {
        Self { center, resolution, rotation }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn pixels_to_world(&self, pixels: f64) -> f64 {
        pixels * self.resolution
    }
}

/// Hints describing what the view is doing this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewHints {
    /// An animated pan/zoom/rotate is in progress.
    pub animating: bool,
    /// The user is dragging or pinching.
    pub interacting: bool,
}

impl ViewHints {
    /// Returns `true` if either hint is set.
    #[must_use]
    pub fn is_moving(self) -> bool {
        self.animating || self.interacting
    }
}

/// Everything a layer renderer needs to know about the frame being drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    /// Viewport size in CSS pixels.
    pub size: Size,
    /// Device pixels per CSS pixel.
    pub pixel_ratio: f64,
    pub view: ViewState,
    pub projection: Projection,
    pub hints: ViewHints,
    /// World extent covered by the (possibly rotated) viewport.
    pub extent: Extent,
}

impl FrameState {
    #[must_use]
    pub fn new(size: Size, pixel_ratio: f64, view: ViewState, projection: Projection) -> Self {
        let extent = Extent::for_view_and_size(view.center, view.resolution, view.rotation, size);
        Self { size, pixel_ratio, view, projection, hints: ViewHints::default(), extent }
    }

    #[must_use]
    pub fn with_hints(mut self, hints: ViewHints) -> Self {
        self.hints = hints;
        self
    }

    /// Canvas size in device pixels.
    #[must_use]
    pub fn canvas_size(&self) -> Size {
        self.size.scaled(self.pixel_ratio)
    }

    /// World coordinate → CSS pixel. The y-axis flips: world north is screen up.
    #[must_use]
    pub fn coordinate_to_pixel_transform(&self) -> Transform {
        let v = &self.view;
        Transform::compose(
            self.size.width / 2.0,
            self.size.height / 2.0,
            1.0 / v.resolution,
            -1.0 / v.resolution,
            -v.rotation,
            -v.center.x,
            -v.center.y,
        )
    }

    /// CSS pixel → world coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Singular`] for a degenerate view (zero or
    /// non-finite resolution).
    pub fn pixel_to_coordinate_transform(&self) -> Result<Transform, TransformError> {
        self.coordinate_to_pixel_transform().inverse()
    }

    #[must_use]
    pub fn coordinate_to_pixel(&self, coordinate: Point) -> Point {
        self.coordinate_to_pixel_transform().apply(coordinate)
    }

    /// # Errors
    ///
    /// See [`FrameState::pixel_to_coordinate_transform`].
    pub fn pixel_to_coordinate(&self, pixel: Point) -> Result<Point, TransformError> {
        Ok(self.pixel_to_coordinate_transform()?.apply(pixel))
    }

    /// World coordinate → device pixel, shifted horizontally by `offset_x`
    /// world units (used when drawing wrapped copies of the world).
    #[must_use]
    pub fn layer_transform(&self, offset_x: f64) -> Transform {
        let v = &self.view;
        let sx = self.pixel_ratio / v.resolution;
        Transform::compose(
            self.pixel_ratio * self.size.width / 2.0,
            self.pixel_ratio * self.size.height / 2.0,
            sx,
            -sx,
            -v.rotation,
            -v.center.x + offset_x,
            -v.center.y,
        )
    }
}
