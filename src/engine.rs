use std::ops::ControlFlow;

use tracing::debug;

use crate::config::MapConfig;
use crate::feature::FeatureId;
use crate::geom::Point;
use crate::render::{DrawBackend, Layer, LayerHit, LayerRenderer, LayerState, RenderError, RendererRegistry};
use crate::view::FrameState;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// A feature found under a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureHit {
    /// Index of the layer the feature was drawn on.
    pub layer: usize,
    pub id: FeatureId,
}

struct LayerEntry {
    layer: Layer,
    state: LayerState,
    renderer: Box<dyn LayerRenderer>,
    /// Whether the layer was composed in the last frame.
    rendered: bool,
}

/// Owns the layer stack and drives frames through each layer's renderer.
///
/// Layers are drawn in insertion order, so the last layer is on top. Hit
/// queries only consider layers composed in the last rendered frame.
pub struct MapEngine {
    config: MapConfig,
    registry: RendererRegistry,
    layers: Vec<LayerEntry>,
    frame: Option<FrameState>,
}

impl Default for MapEngine {
    fn default() -> Self {
        Self::new(MapConfig::default())
    }
}

impl MapEngine {
    #[must_use]
    pub fn new(config: MapConfig) -> Self {
        Self { config, registry: RendererRegistry::default(), layers: Vec::new(), frame: None }
    }

    /// Use `registry` to resolve renderers for layers added from now on.
    #[must_use]
    pub fn with_registry(mut self, registry: RendererRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    // --- Layer stack ---

    /// Push `layer` on top of the stack and resolve its renderer. Returns the
    /// layer's index.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NoRenderer`] if the registry has no renderer for
    /// this kind of layer; the layer is not added.
    pub fn add_layer(&mut self, layer: Layer, state: LayerState) -> Result<usize, RenderError> {
        let renderer = self.registry.create(&layer, &self.config)?;
        self.layers.push(LayerEntry { layer, state, renderer, rendered: false });
        Ok(self.layers.len() - 1)
    }

    /// Remove and return the layer at `index`. Layers above it shift down.
    pub fn remove_layer(&mut self, index: usize) -> Option<Layer> {
        if index >= self.layers.len() {
            return None;
        }
        Some(self.layers.remove(index).layer)
    }

    #[must_use]
    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index).map(|e| &e.layer)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index).map(|e| &mut e.layer)
    }

    #[must_use]
    pub fn layer_state(&self, index: usize) -> Option<&LayerState> {
        self.layers.get(index).map(|e| &e.state)
    }

    pub fn layer_state_mut(&mut self, index: usize) -> Option<&mut LayerState> {
        self.layers.get_mut(index).map(|e| &mut e.state)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    // --- Frames ---

    /// Prepare and compose every layer visible at the frame's resolution,
    /// bottom to top.
    ///
    /// # Errors
    ///
    /// Stops at the first layer whose renderer fails to prepare. Layers below
    /// it have already been drawn.
    pub fn render_frame(&mut self, frame: FrameState, backend: &mut dyn DrawBackend) -> Result<(), RenderError> {
        let frame = self.frame.insert(frame);
        let resolution = frame.view.resolution;
        let mut composed = 0usize;

        for entry in &mut self.layers {
            entry.rendered = false;
        }
        for entry in &mut self.layers {
            if !entry.state.is_visible_at(resolution) {
                continue;
            }
            if entry.renderer.prepare_frame(&mut entry.layer, frame, &entry.state)? {
                entry.renderer.compose_frame(&entry.layer, frame, &entry.state, backend);
                entry.rendered = true;
                composed += 1;
            }
        }

        debug!(layers = self.layers.len(), composed, resolution, "frame rendered");
        Ok(())
    }

    /// The last frame passed to [`MapEngine::render_frame`].
    #[must_use]
    pub fn frame(&self) -> Option<&FrameState> {
        self.frame.as_ref()
    }

    // --- Hit detection ---

    /// Layers with something drawn under `pixel` (CSS pixels), top-most first.
    #[must_use]
    pub fn layers_at_pixel(&self, pixel: Point) -> Vec<(usize, LayerHit)> {
        let Some(frame) = &self.frame else {
            return Vec::new();
        };
        self.rendered_top_down()
            .filter_map(|(index, entry)| entry.renderer.layer_at_pixel(&entry.layer, pixel, frame).map(|hit| (index, hit)))
            .collect()
    }

    /// Features drawn under `pixel` (CSS pixels), top-most layer first.
    #[must_use]
    pub fn features_at_pixel(&self, pixel: Point) -> Vec<FeatureHit> {
        let Some(frame) = &self.frame else {
            return Vec::new();
        };
        let coordinate = match frame.pixel_to_coordinate(pixel) {
            Ok(c) => c,
            Err(err) => {
                debug!(%err, "pixel has no map coordinate");
                return Vec::new();
            }
        };

        let mut hits = Vec::new();
        for (index, entry) in self.rendered_top_down() {
            let flow = entry.renderer.for_each_feature_at_coordinate(
                &entry.layer,
                coordinate,
                frame,
                self.config.hit_tolerance_px,
                &mut |feature| {
                    hits.push(FeatureHit { layer: index, id: feature.id });
                    ControlFlow::Continue(())
                },
            );
            if flow.is_break() {
                break;
            }
        }
        hits
    }

    fn rendered_top_down(&self) -> impl Iterator<Item = (usize, &LayerEntry)> {
        self.layers.iter().enumerate().rev().filter(|(_, e)| e.rendered)
    }
}
