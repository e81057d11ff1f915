use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::cluster::ClusterError;
use crate::feature::{FeatureId, Geometry};
use crate::geom::{Extent, Size};
use crate::render::RasterImage;
use crate::source::{FeatureLoader, LoadingStrategy};
use crate::transform::Transform;
use crate::view::{Projection, ViewState};

#[derive(Debug, PartialEq)]
enum Call {
    Circle(Point, f64),
    Label(Point, String),
}

#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
}

impl DrawBackend for Recorder {
    fn draw_image(&mut self, _image: &RasterImage, _projection: &Transform, _tex_coord: &Transform, _opacity: f64) {}
    fn draw_circle(&mut self, center: Point, radius: f64, _opacity: f64) {
        self.calls.push(Call::Circle(center, radius));
    }
    fn draw_label(&mut self, at: Point, text: &str) {
        self.calls.push(Call::Label(at, text.to_string()));
    }
}

/// 200×100 CSS pixels centered on the origin at one world unit per pixel.
fn frame(pixel_ratio: f64) -> FrameState {
    FrameState::new(Size::new(200.0, 100.0), pixel_ratio, ViewState::new(Point::new(0.0, 0.0), 1.0, 0.0), Projection::default())
}

fn layer_with(points: &[(f64, f64)]) -> Layer {
    let source = VectorSource::from_features(points.iter().map(|&(x, y)| Feature::point(x, y)));
    Layer::Cluster(ClusterLayer::from_config(source, &MapConfig::default()))
}

fn prepared(points: &[(f64, f64)], frame: &FrameState) -> (Layer, ClusterLayerRenderer) {
    let mut layer = layer_with(points);
    let mut renderer = ClusterLayerRenderer::new(&MapConfig::default());
    assert!(renderer.prepare_frame(&mut layer, frame, &LayerState::default()).unwrap());
    (layer, renderer)
}

fn hits(renderer: &ClusterLayerRenderer, layer: &Layer, at: Point, tolerance: f64) -> Vec<FeatureId> {
    let mut found = Vec::new();
    let _ = renderer.for_each_feature_at_coordinate(layer, at, &frame(1.0), tolerance, &mut |f| {
        found.push(f.id);
        ControlFlow::Continue(())
    });
    found
}

fn cluster_ids(layer: &Layer) -> Vec<FeatureId> {
    match layer {
        Layer::Cluster(l) => l.clusters().features().iter().map(|c| c.id()).collect(),
        Layer::Image(_) => Vec::new(),
    }
}

// =============================================================
// prepare
// =============================================================

#[test]
fn prepare_clusters_at_frame_resolution() {
    let (layer, _) = prepared(&[(0.0, 0.0), (5.0, 0.0), (100.0, 100.0)], &frame(1.0));
    let Layer::Cluster(l) = &layer else { panic!("cluster layer expected") };
    assert_eq!(l.clusters().resolution(), Some(1.0));
    let points: Vec<Point> = l.clusters().features().iter().map(|c| c.point()).collect();
    assert_eq!(points, vec![Point::new(2.5, 0.0), Point::new(100.0, 100.0)]);
}

#[test]
fn prepare_loads_buffered_frame_extent() {
    let requested: Rc<RefCell<Vec<Extent>>> = Rc::default();
    let log = Rc::clone(&requested);
    let loader: FeatureLoader = Box::new(move |extent: &Extent, _r: f64, _p: &Projection| {
        log.borrow_mut().push(*extent);
        Vec::new()
    });
    let source = VectorSource::with_loader(loader, LoadingStrategy::Bbox);
    let mut layer = Layer::Cluster(ClusterLayer::from_config(source, &MapConfig::default()));
    let mut renderer = ClusterLayerRenderer::new(&MapConfig::default());

    let drew = renderer.prepare_frame(&mut layer, &frame(1.0), &LayerState::default()).unwrap();
    assert!(!drew);
    assert_eq!(*requested.borrow(), vec![Extent::new(-200.0, -150.0, 200.0, 150.0)]);
}

#[test]
fn prepare_surfaces_cluster_errors() {
    let line = Feature::new(Some(Geometry::LineString(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)])));
    let source = VectorSource::from_features(vec![line]);
    let mut layer = Layer::Cluster(ClusterLayer::from_config(source, &MapConfig::default()));
    let mut renderer = ClusterLayerRenderer::new(&MapConfig::default());
    let err = renderer.prepare_frame(&mut layer, &frame(1.0), &LayerState::default()).unwrap_err();
    assert!(matches!(err, RenderError::Cluster(ClusterError::UnsupportedGeometry { kind: "linestring", .. })));
}

#[test]
fn configured_distance_reaches_engine() {
    let config = MapConfig { cluster_distance_px: 2.0, ..MapConfig::default() };
    let layer = ClusterLayer::from_config(VectorSource::new(), &config);
    assert_eq!(layer.clusters().distance(), 2.0);
}

// =============================================================
// compose
// =============================================================

#[test]
fn compose_draws_circle_per_cluster_and_labels_groups() {
    let frame = frame(1.0);
    let (layer, renderer) = prepared(&[(0.0, 0.0), (5.0, 0.0), (100.0, 100.0)], &frame);
    let mut backend = Recorder::default();
    renderer.compose_frame(&layer, &frame, &LayerState::default(), &mut backend);
    assert_eq!(
        backend.calls,
        vec![
            Call::Circle(Point::new(102.5, 50.0), 10.0),
            Call::Label(Point::new(102.5, 50.0), "2".into()),
            Call::Circle(Point::new(200.0, -50.0), 10.0),
        ]
    );
}

#[test]
fn compose_scales_to_device_pixels() {
    let frame = frame(2.0);
    let (layer, renderer) = prepared(&[(10.0, 10.0)], &frame);
    let mut backend = Recorder::default();
    renderer.compose_frame(&layer, &frame, &LayerState::default(), &mut backend);
    assert_eq!(backend.calls, vec![Call::Circle(Point::new(220.0, 80.0), 20.0)]);
}

// =============================================================
// hit detection
// =============================================================

#[test]
fn coordinate_within_radius_hits_cluster() {
    let (layer, renderer) = prepared(&[(0.0, 0.0), (5.0, 0.0)], &frame(1.0));
    assert_eq!(hits(&renderer, &layer, Point::new(2.5, 9.0), 0.0), cluster_ids(&layer));
    assert!(hits(&renderer, &layer, Point::new(2.5, 11.0), 0.0).is_empty());
    assert_eq!(hits(&renderer, &layer, Point::new(2.5, 11.0), 2.0).len(), 1);
}

#[test]
fn overlapping_clusters_report_top_most_first() {
    let (layer, renderer) = prepared(&[(0.0, 0.0), (30.0, 0.0)], &frame(1.0));
    let ids = cluster_ids(&layer);
    assert_eq!(ids.len(), 2);
    assert_eq!(hits(&renderer, &layer, Point::new(15.0, 0.0), 6.0), vec![ids[1], ids[0]]);
}

#[test]
fn break_stops_iteration() {
    let (layer, renderer) = prepared(&[(0.0, 0.0), (30.0, 0.0)], &frame(1.0));
    let mut visited = 0;
    let flow = renderer.for_each_feature_at_coordinate(&layer, Point::new(15.0, 0.0), &frame(1.0), 6.0, &mut |_| {
        visited += 1;
        ControlFlow::Break(())
    });
    assert!(flow.is_break());
    assert_eq!(visited, 1);
}

#[test]
fn layer_at_pixel_uses_feature_hits() {
    let frame = frame(1.0);
    let (layer, renderer) = prepared(&[(0.0, 0.0), (5.0, 0.0)], &frame);
    let hit = renderer.layer_at_pixel(&layer, Point::new(102.5, 50.0), &frame).unwrap();
    assert_eq!(hit.source_pixel, None);
    assert!(renderer.layer_at_pixel(&layer, Point::new(0.0, 0.0), &frame).is_none());
}
