//! Cluster layers: point features drawn as one circle per cluster.

#[cfg(test)]
#[path = "cluster_layer_test.rs"]
mod cluster_layer_test;

use std::ops::ControlFlow;

use super::{DrawBackend, Layer, LayerRenderer, LayerState, RenderError, RendererFactory};
use crate::cluster::ClusterEngine;
use crate::config::MapConfig;
use crate::feature::Feature;
use crate::geom::Point;
use crate::source::VectorSource;
use crate::view::FrameState;

/// A layer whose features are the clusters of a [`VectorSource`].
pub struct ClusterLayer {
    clusters: ClusterEngine<VectorSource>,
}

impl ClusterLayer {
    #[must_use]
    pub fn new(clusters: ClusterEngine<VectorSource>) -> Self {
        Self { clusters }
    }

    /// Cluster `source` with the configured pixel distance.
    #[must_use]
    pub fn from_config(source: VectorSource, config: &MapConfig) -> Self {
        Self::new(ClusterEngine::new(source).with_distance(config.cluster_distance_px))
    }

    #[must_use]
    pub fn clusters(&self) -> &ClusterEngine<VectorSource> {
        &self.clusters
    }

    pub fn clusters_mut(&mut self) -> &mut ClusterEngine<VectorSource> {
        &mut self.clusters
    }
}

pub(super) const FACTORY: RendererFactory =
    RendererFactory { name: "cluster", handles: handles_cluster, create: create_cluster_renderer };

fn handles_cluster(layer: &Layer) -> bool {
    matches!(layer, Layer::Cluster(_))
}

fn create_cluster_renderer(_layer: &Layer, config: &MapConfig) -> Box<dyn LayerRenderer> {
    Box::new(ClusterLayerRenderer::new(config))
}

/// Renderer for [`ClusterLayer`]s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterLayerRenderer {
    radius_px: f64,
    render_buffer_px: f64,
}

impl ClusterLayerRenderer {
    #[must_use]
    pub fn new(config: &MapConfig) -> Self {
        Self { radius_px: config.cluster_radius_px, render_buffer_px: config.render_buffer_px }
    }
}

impl LayerRenderer for ClusterLayerRenderer {
    fn prepare_frame(&mut self, layer: &mut Layer, frame: &FrameState, _state: &LayerState) -> Result<bool, RenderError> {
        let Layer::Cluster(layer) = layer else {
            return Ok(false);
        };
        let resolution = frame.view.resolution;
        let extent = frame.extent.buffer(self.render_buffer_px * resolution);
        layer.clusters.load_features(&extent, resolution, &frame.projection)?;
        Ok(!layer.clusters.is_empty())
    }

    fn compose_frame(&self, layer: &Layer, frame: &FrameState, state: &LayerState, backend: &mut dyn DrawBackend) {
        let Layer::Cluster(layer) = layer else {
            return;
        };
        let to_device = frame.layer_transform(0.0);
        let radius = self.radius_px * frame.pixel_ratio;
        for cluster in layer.clusters.features() {
            let at = to_device.apply(cluster.point());
            backend.draw_circle(at, radius, state.opacity);
            if cluster.size() > 1 {
                backend.draw_label(at, &cluster.size().to_string());
            }
        }
    }

    fn for_each_feature_at_coordinate(
        &self,
        layer: &Layer,
        coordinate: Point,
        frame: &FrameState,
        hit_tolerance: f64,
        callback: &mut dyn FnMut(&Feature) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        let Layer::Cluster(layer) = layer else {
            return ControlFlow::Continue(());
        };
        let reach = (self.radius_px + hit_tolerance) * frame.view.resolution;
        // Later clusters are drawn on top.
        for cluster in layer.clusters.features().iter().rev() {
            if cluster.point().distance(coordinate) <= reach && callback(cluster.feature()).is_break() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}
