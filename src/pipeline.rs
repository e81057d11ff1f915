//! Composite matrices for raster layers: world → device projection and
//! device pixel → source-image pixel hit-testing.
//!
//! The projection maps the raster's quad, given in `[-1, 1]²` corner
//! coordinates, to clip space for the current view. The hit matrix runs the
//! same chain backwards: map pixel → clip space → (projection⁻¹) → quad
//! coordinates → raster pixel. Both are built with the right-multiplying
//! builders of [`Transform`], so the step order written here is outermost
//! first.

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;

use crate::geom::{Extent, Size};
use crate::transform::{Transform, TransformError};
use crate::view::ViewState;

/// Rebuild `out` as the device projection for a raster covering `image_extent`.
///
/// `canvas_width` / `canvas_height` are in device pixels; the canvas extent in
/// world units is `canvas_pixels × resolution`.
pub fn update_device_projection(
    out: &mut Transform,
    canvas_width: f64,
    canvas_height: f64,
    pixel_ratio: f64,
    view: &ViewState,
    image_extent: &Extent,
) {
    let canvas_extent_width = canvas_width * view.resolution;
    let canvas_extent_height = canvas_height * view.resolution;

    out.reset()
        .scale(pixel_ratio * 2.0 / canvas_extent_width, pixel_ratio * 2.0 / canvas_extent_height)
        .rotate(-view.rotation)
        .translate(image_extent.min_x - view.center.x, image_extent.min_y - view.center.y)
        .scale(image_extent.width() / 2.0, image_extent.height() / 2.0)
        .translate(1.0, 1.0);
}

/// Value-style [`update_device_projection`].
#[must_use]
pub fn device_projection(
    canvas_width: f64,
    canvas_height: f64,
    pixel_ratio: f64,
    view: &ViewState,
    image_extent: &Extent,
) -> Transform {
    let mut out = Transform::identity();
    update_device_projection(&mut out, canvas_width, canvas_height, pixel_ratio, view, image_extent);
    out
}

/// Map pixel (CSS pixels, y down) → clip space (`[-1, 1]²`, y up).
#[must_use]
pub fn map_pixel_to_clip(map_size: Size) -> Transform {
    let mut t = Transform::identity();
    t.translate(-1.0, -1.0)
        .scale(2.0 / map_size.width, 2.0 / map_size.height)
        .translate(0.0, map_size.height)
        .scale(1.0, -1.0);
    t
}

/// Quad coordinates (`[-1, 1]²`, y up) → raster pixel (y down).
#[must_use]
pub fn clip_to_image_pixel(image_size: Size) -> Transform {
    let mut t = Transform::identity();
    t.translate(0.0, image_size.height)
        .scale(1.0, -1.0)
        .scale(image_size.width / 2.0, image_size.height / 2.0)
        .translate(1.0, 1.0);
    t
}

/// Flip texture coordinates so row 0 of the raster is drawn at the top.
#[must_use]
pub fn tex_coord_matrix() -> Transform {
    let mut t = Transform::identity();
    t.scale(1.0, -1.0).translate(0.0, -1.0);
    t
}

/// Map pixel → source-image pixel for a raster drawn with `projection`.
///
/// # Errors
///
/// Returns [`TransformError::Singular`] when `projection` cannot be inverted,
/// which happens at zero resolution or for a zero-area raster extent.
pub fn hit_transform(projection: &Transform, map_size: Size, image_size: Size) -> Result<Transform, TransformError> {
    let projection_inv = projection.inverse()?;
    Ok(clip_to_image_pixel(image_size) * projection_inv * map_pixel_to_clip(map_size))
}
