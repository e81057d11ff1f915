//! Layer rendering: the renderer capability, the registry that picks a
//! renderer for each layer, and the seam to the drawing backend.
//!
//! Each [`Layer`] gets one [`LayerRenderer`], resolved once when the layer is
//! added to the map through [`RendererRegistry::create`]. Renderers own their
//! per-layer scratch state (matrices, cached hit transforms) but not the layer
//! itself; the engine passes the layer in on every call.
//!
//! Nothing here rasterizes. Draw calls go to a [`DrawBackend`] supplied by the
//! host (Canvas2D, WebGL, a test recorder).


pub mod cluster_layer;
pub mod image;

use std::ops::ControlFlow;

use crate::cluster::ClusterError;
use crate::config::MapConfig;
use crate::feature::Feature;
use crate::geom::{Extent, Point};
use crate::transform::Transform;
use crate::view::FrameState;

pub use cluster_layer::{ClusterLayer, ClusterLayerRenderer};
pub use image::{ImageLayer, ImageLayerRenderer, ImageSource, RasterError, RasterImage, StaticImageSource};

/// Errors raised while preparing or resolving layer renderers.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No registered renderer handles this kind of layer.
    #[error("no renderer registered for {kind} layers")]
    NoRenderer { kind: &'static str },
    /// Clustering failed while preparing a cluster layer.
    #[error("cluster layer failed: {0}")]
    Cluster(#[from] ClusterError),
}

/// The drawing surface. Implemented by the host.
pub trait DrawBackend {
    /// Draw `image` through `projection` (quad → clip space) with texture
    /// coordinates flipped by `tex_coord`.
    fn draw_image(&mut self, image: &RasterImage, projection: &Transform, tex_coord: &Transform, opacity: f64);

    /// Draw a filled circle centered on a device pixel.
    fn draw_circle(&mut self, center: Point, radius: f64, opacity: f64);

    /// Draw a text label centered on a device pixel.
    fn draw_label(&mut self, at: Point, text: &str);
}

/// A map layer.
pub enum Layer {
    /// A single georeferenced raster.
    Image(ImageLayer),
    /// Point features drawn as clusters.
    Cluster(ClusterLayer),
}

impl Layer {
    /// Lowercase kind name for logs and errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Cluster(_) => "cluster",
        }
    }
}

/// Per-layer display settings owned by the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerState {
    pub visible: bool,
    pub opacity: f64,
    /// Clip the layer to this world extent.
    pub extent: Option<Extent>,
    /// Lowest resolution (inclusive) at which the layer is drawn.
    pub min_resolution: f64,
    /// Highest resolution (exclusive) at which the layer is drawn.
    pub max_resolution: f64,
}

impl Default for LayerState {
    fn default() -> Self {
        Self { visible: true, opacity: 1.0, extent: None, min_resolution: 0.0, max_resolution: f64::INFINITY }
    }
}

impl LayerState {
    /// Whether the layer should be drawn at `resolution`.
    #[must_use]
    pub fn is_visible_at(&self, resolution: f64) -> bool {
        self.visible && self.min_resolution <= resolution && resolution < self.max_resolution
    }
}

/// What a pixel query found on a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerHit {
    /// Pixel in the source raster's own coordinates, for image layers.
    pub source_pixel: Option<Point>,
    /// RGBA of that source pixel, for image layers.
    pub rgba: Option<[u8; 4]>,
}

/// Renders one layer and answers hit queries against it.
pub trait LayerRenderer {
    /// Bring renderer state up to date for `frame`. Returns `false` when there
    /// is nothing to compose.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Cluster`] when a cluster layer cannot be built.
    fn prepare_frame(&mut self, layer: &mut Layer, frame: &FrameState, state: &LayerState) -> Result<bool, RenderError>;

    /// Emit draw calls for the prepared frame.
    fn compose_frame(&self, layer: &Layer, frame: &FrameState, state: &LayerState, backend: &mut dyn DrawBackend);

    /// Call `callback` for each feature drawn at `coordinate`, top-most first,
    /// until it breaks.
    fn for_each_feature_at_coordinate(
        &self,
        layer: &Layer,
        coordinate: Point,
        frame: &FrameState,
        hit_tolerance: f64,
        callback: &mut dyn FnMut(&Feature) -> ControlFlow<()>,
    ) -> ControlFlow<()>;

    /// Whether the layer has something under `pixel` (CSS pixels).
    ///
    /// The default converts the pixel to a coordinate and asks
    /// [`LayerRenderer::for_each_feature_at_coordinate`].
    fn layer_at_pixel(&self, layer: &Layer, pixel: Point, frame: &FrameState) -> Option<LayerHit> {
        let Ok(coordinate) = frame.pixel_to_coordinate(pixel) else {
            return None;
        };
        let found = self.for_each_feature_at_coordinate(layer, coordinate, frame, 0.0, &mut |_| ControlFlow::Break(()));
        found.is_break().then_some(LayerHit { source_pixel: None, rgba: None })
    }
}

/// Constructor entry for one renderer kind.
#[derive(Clone, Copy)]
pub struct RendererFactory {
    pub name: &'static str,
    pub handles: fn(&Layer) -> bool,
    pub create: fn(&Layer, &MapConfig) -> Box<dyn LayerRenderer>,
}

/// Ordered list of renderer factories. The first that handles a layer wins.
#[derive(Clone)]
pub struct RendererRegistry {
    factories: Vec<RendererFactory>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self { factories: vec![image::FACTORY, cluster_layer::FACTORY] }
    }
}

impl RendererRegistry {
    /// A registry with no factories.
    #[must_use]
    pub fn empty() -> Self {
        Self { factories: Vec::new() }
    }

    /// Add a factory. Factories registered later are consulted first.
    pub fn register(&mut self, factory: RendererFactory) {
        self.factories.insert(0, factory);
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.iter().map(|f| f.name).collect()
    }

    /// Create the renderer for `layer`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NoRenderer`] if no factory handles the layer.
    pub fn create(&self, layer: &Layer, config: &MapConfig) -> Result<Box<dyn LayerRenderer>, RenderError> {
        let factory = self
            .factories
            .iter()
            .find(|f| (f.handles)(layer))
            .ok_or(RenderError::NoRenderer { kind: layer.kind() })?;
        tracing::info!(renderer = factory.name, layer = layer.kind(), "layer renderer resolved");
        Ok((factory.create)(layer, config))
    }
}
