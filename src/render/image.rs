//! Single-raster layers.
//!
//! The renderer draws one georeferenced RGBA raster through the device
//! projection built by [`crate::pipeline::update_device_projection`]. Pixel
//! hit-tests run the inverse chain (map pixel → clip → quad → raster pixel)
//! and report a hit when the raster pixel under the cursor is not fully
//! transparent.

#[cfg(test)]
#[path = "image_test.rs"]
mod image_test;

use std::cell::Cell;
use std::ops::ControlFlow;
use std::rc::Rc;

use tracing::{debug, trace};

use super::{DrawBackend, Layer, LayerHit, LayerRenderer, LayerState, RenderError, RendererFactory};
use crate::config::MapConfig;
use crate::feature::Feature;
use crate::geom::{Extent, Point, Size};
use crate::pipeline;
use crate::transform::Transform;
use crate::view::{FrameState, Projection};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RasterError {
    #[error("RGBA buffer holds {actual} bytes; a {width}x{height} raster needs {expected}")]
    BufferSize { width: u32, height: u32, expected: usize, actual: usize },
}

/// An RGBA8 raster covering a world extent. Row 0 is the top (north) row.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub extent: Extent,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl RasterImage {
    /// # Errors
    ///
    /// Returns [`RasterError::BufferSize`] unless `rgba` holds exactly
    /// `width × height × 4` bytes.
    pub fn new(extent: Extent, width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, RasterError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(RasterError::BufferSize { width, height, expected, actual: rgba.len() });
        }
        Ok(Self { extent, width, height, rgba })
    }

    /// A raster with every pixel set to `rgba`.
    #[must_use]
    pub fn filled(extent: Extent, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let rgba = rgba.repeat(width as usize * height as usize);
        Self { extent, width, height, rgba }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    #[must_use]
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// RGBA at raster pixel `(x, y)`, or `None` outside the raster.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Supplies rasters for a requested view.
pub trait ImageSource {
    /// The image to draw for `extent` at `resolution`, or `None` when there is
    /// nothing to show.
    fn get_image(&self, extent: &Extent, resolution: f64, pixel_ratio: f64, projection: &Projection)
    -> Option<Rc<RasterImage>>;
}

/// Serves one fixed raster whenever it intersects the requested extent.
pub struct StaticImageSource {
    image: Rc<RasterImage>,
}

impl StaticImageSource {
    #[must_use]
    pub fn new(image: RasterImage) -> Self {
        Self { image: Rc::new(image) }
    }
}

impl ImageSource for StaticImageSource {
    fn get_image(&self, extent: &Extent, _resolution: f64, _pixel_ratio: f64, _projection: &Projection)
    -> Option<Rc<RasterImage>> {
        self.image.extent.intersects(extent).then(|| Rc::clone(&self.image))
    }
}

/// A layer showing one raster from an [`ImageSource`].
pub struct ImageLayer {
    pub source: Box<dyn ImageSource>,
}

impl ImageLayer {
    #[must_use]
    pub fn new(source: impl ImageSource + 'static) -> Self {
        Self { source: Box::new(source) }
    }
}

pub(super) const FACTORY: RendererFactory =
    RendererFactory { name: "image", handles: handles_image, create: create_image_renderer };

fn handles_image(layer: &Layer) -> bool {
    matches!(layer, Layer::Image(_))
}

fn create_image_renderer(_layer: &Layer, _config: &MapConfig) -> Box<dyn LayerRenderer> {
    Box::new(ImageLayerRenderer::new())
}

/// Renderer for [`ImageLayer`]s.
#[derive(Debug, Default)]
pub struct ImageLayerRenderer {
    image: Option<Rc<RasterImage>>,
    projection_matrix: Transform,
    tex_coord_matrix: Transform,
    /// Map pixel → raster pixel, computed on the first hit-test of a frame.
    hit_transform: Cell<Option<Transform>>,
}

impl ImageLayerRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The raster currently drawn, if any.
    #[must_use]
    pub fn image(&self) -> Option<&RasterImage> {
        self.image.as_deref()
    }

    #[must_use]
    pub fn projection_matrix(&self) -> &Transform {
        &self.projection_matrix
    }

    #[must_use]
    pub fn tex_coord_matrix(&self) -> &Transform {
        &self.tex_coord_matrix
    }

    fn cached_hit_transform(&self, image: &RasterImage, frame: &FrameState) -> Option<Transform> {
        if let Some(t) = self.hit_transform.get() {
            return Some(t);
        }
        match pipeline::hit_transform(&self.projection_matrix, frame.size, image.size()) {
            Ok(t) => {
                self.hit_transform.set(Some(t));
                Some(t)
            }
            Err(err) => {
                debug!(%err, resolution = frame.view.resolution, "image hit transform unavailable");
                None
            }
        }
    }
}

impl LayerRenderer for ImageLayerRenderer {
    fn prepare_frame(&mut self, layer: &mut Layer, frame: &FrameState, state: &LayerState) -> Result<bool, RenderError> {
        let Layer::Image(layer) = layer else {
            return Ok(false);
        };

        let rendered_extent = match &state.extent {
            Some(clip) => frame.extent.intersection(clip),
            None => frame.extent,
        };

        if !frame.hints.is_moving() && !rendered_extent.is_empty() {
            let image =
                layer.source.get_image(&rendered_extent, frame.view.resolution, frame.pixel_ratio, &frame.projection);
            if let Some(image) = image {
                self.image = Some(image);
            }
        }

        let Some(image) = &self.image else {
            trace!("no raster to draw");
            return Ok(false);
        };

        let canvas = frame.canvas_size();
        pipeline::update_device_projection(
            &mut self.projection_matrix,
            canvas.width,
            canvas.height,
            frame.pixel_ratio,
            &frame.view,
            &image.extent,
        );
        self.hit_transform.set(None);
        self.tex_coord_matrix = pipeline::tex_coord_matrix();
        Ok(true)
    }

    fn compose_frame(&self, _layer: &Layer, _frame: &FrameState, state: &LayerState, backend: &mut dyn DrawBackend) {
        if let Some(image) = &self.image {
            backend.draw_image(image, &self.projection_matrix, &self.tex_coord_matrix, state.opacity);
        }
    }

    fn for_each_feature_at_coordinate(
        &self,
        _layer: &Layer,
        _coordinate: Point,
        _frame: &FrameState,
        _hit_tolerance: f64,
        _callback: &mut dyn FnMut(&Feature) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn layer_at_pixel(&self, _layer: &Layer, pixel: Point, frame: &FrameState) -> Option<LayerHit> {
        let image = self.image.as_deref()?;
        let source_pixel = self.cached_hit_transform(image, frame)?.apply(pixel);

        let size = image.size();
        if !(source_pixel.x >= 0.0 && source_pixel.x < size.width && source_pixel.y >= 0.0 && source_pixel.y < size.height)
        {
            return None;
        }
        let rgba = image.pixel(source_pixel.x.floor() as u32, source_pixel.y.floor() as u32)?;
        (rgba[3] > 0).then_some(LayerHit { source_pixel: Some(source_pixel), rgba: Some(rgba) })
    }
}
