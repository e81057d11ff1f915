//! Proximity clustering of point features.
//!
//! [`ClusterEngine`] wraps a [`FeatureSource`] and derives a set of cluster
//! features from it for the current resolution. Clustering is greedy and
//! follows source order: each feature not yet claimed seeds a cluster that
//! claims every unclaimed feature whose geometry bounds fall within
//! `distance × resolution` world units of the seed's cluster point. A
//! feature therefore belongs to at most one cluster, and the first seed to
//! reach it wins.
//!
//! The cluster set is cached per resolution. It is rebuilt wholesale when
//! [`ClusterEngine::load_features`] sees a new resolution, when
//! [`ClusterEngine::refresh`] is called, or when the wrapped source signalled
//! a change: edits made through [`ClusterEngine::source_mut`] are applied as
//! soon as the returned [`SourceMut`] guard is released, and changes that
//! arrive any other way are applied on the next load. A rebuild replaces the
//! previous set only once it has completed.

#[cfg(test)]
#[path = "cluster_test.rs"]
mod cluster_test;

use std::cell::Cell;
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::consts::{CLUSTER_MEMBERS_KEY, DEFAULT_CLUSTER_DISTANCE_PX};
use crate::feature::{Feature, FeatureId, Geometry};
use crate::geom::{Extent, Point};
use crate::source::{FeatureSource, Subscription};
use crate::view::Projection;

/// Error returned when a cluster set cannot be built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClusterError {
    /// The default cluster point needs point geometries.
    #[error("feature {id} has {kind} geometry; clustering it needs a custom cluster point function")]
    UnsupportedGeometry { id: FeatureId, kind: &'static str },
}

/// Picks the point a feature contributes to clustering. Returning `None`
/// keeps the feature from seeding a cluster.
pub type ClusterPointFn = Box<dyn Fn(&Feature) -> Option<Point>>;

/// A synthesized cluster: one point feature standing for its members.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    feature: Feature,
    point: Point,
    members: Vec<Feature>,
}

impl Cluster {
    /// The synthesized point feature. Its `"features"` attribute lists the
    /// member ids in member order.
    #[must_use]
    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    #[must_use]
    pub fn id(&self) -> FeatureId {
        self.feature.id
    }

    /// Mean of the members' cluster points.
    #[must_use]
    pub fn point(&self) -> Point {
        self.point
    }

    /// Member features, in the order they were claimed.
    #[must_use]
    pub fn members(&self) -> &[Feature] {
        &self.members
    }

    /// Number of members. Never zero.
    #[must_use]
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Clusters the features of a wrapped source for a given resolution.
pub struct ClusterEngine<S: FeatureSource> {
    source: S,
    distance: f64,
    resolution: Option<f64>,
    clusters: Vec<Cluster>,
    cluster_point: Option<ClusterPointFn>,
    stale: Rc<Cell<bool>>,
    _subscription: Subscription,
}

impl<S: FeatureSource> ClusterEngine<S> {
    /// Wrap `source` with the default distance and cluster point. Nothing is
    /// built until the first [`ClusterEngine::load_features`].
    #[must_use]
    pub fn new(source: S) -> Self {
        let stale = Rc::new(Cell::new(false));
        let flag = Rc::clone(&stale);
        let subscription = source.on_change(Box::new(move || flag.set(true)));
        Self {
            source,
            distance: DEFAULT_CLUSTER_DISTANCE_PX,
            resolution: None,
            clusters: Vec::new(),
            cluster_point: None,
            stale,
            _subscription: subscription,
        }
    }

    /// Set the initial cluster distance in pixels.
    #[must_use]
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    /// Replace the default cluster point (the feature's own point geometry).
    #[must_use]
    pub fn with_cluster_point(mut self, f: impl Fn(&Feature) -> Option<Point> + 'static) -> Self {
        self.cluster_point = Some(Box::new(f));
        self
    }

    /// Load the wrapped source for this view, then rebuild if `resolution`
    /// differs from the last build or the source changed since.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::UnsupportedGeometry`] if the default cluster
    /// point meets a non-point feature. The previous cluster set is kept.
    pub fn load_features(&mut self, extent: &Extent, resolution: f64, projection: &Projection) -> Result<(), ClusterError> {
        self.source.load_features(extent, resolution, projection);
        if self.resolution == Some(resolution) {
            self.refresh_if_stale()
        } else {
            self.rebuild(Some(resolution))
        }
    }

    /// Rebuild at the current resolution regardless of cache state. Before the
    /// first load this yields an empty set.
    ///
    /// # Errors
    ///
    /// See [`ClusterEngine::load_features`].
    pub fn refresh(&mut self) -> Result<(), ClusterError> {
        self.rebuild(self.resolution)
    }

    /// Cluster distance in pixels.
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Change the cluster distance and rebuild.
    ///
    /// # Errors
    ///
    /// See [`ClusterEngine::load_features`].
    pub fn set_distance(&mut self, distance: f64) -> Result<(), ClusterError> {
        self.distance = distance;
        self.refresh()
    }

    /// Resolution of the current cluster set; `None` before the first build.
    #[must_use]
    pub fn resolution(&self) -> Option<f64> {
        self.resolution
    }

    /// The current cluster set.
    #[must_use]
    pub fn features(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Clusters whose point lies inside `extent`.
    #[must_use]
    pub fn clusters_in_extent(&self, extent: &Extent) -> Vec<&Cluster> {
        self.clusters.iter().filter(|c| extent.contains_point(c.point)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Returns `true` if the source changed since the last build.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale.get()
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the wrapped source. If the source signals a change
    /// while borrowed, the cluster set is rebuilt at the current resolution
    /// when the guard is released. Use [`SourceMut::commit`] to see a failed
    /// rebuild; a dropped guard only logs it.
    pub fn source_mut(&mut self) -> SourceMut<'_, S> {
        SourceMut { engine: self, committed: false }
    }

    fn refresh_if_stale(&mut self) -> Result<(), ClusterError> {
        if self.stale.get() {
            self.refresh()
        } else {
            Ok(())
        }
    }

    fn rebuild(&mut self, resolution: Option<f64>) -> Result<(), ClusterError> {
        let clusters = match resolution {
            Some(r) => self.build(r)?,
            None => Vec::new(),
        };
        debug!(
            resolution = ?resolution,
            distance = self.distance,
            clusters = clusters.len(),
            "cluster set rebuilt"
        );
        self.resolution = resolution;
        self.clusters = clusters;
        self.stale.set(false);
        Ok(())
    }

    fn build(&self, resolution: f64) -> Result<Vec<Cluster>, ClusterError> {
        let map_distance = self.distance * resolution;
        let mut clustered: HashSet<FeatureId> = HashSet::new();
        let mut clusters = Vec::new();

        for feature in self.source.features() {
            if clustered.contains(&feature.id) {
                continue;
            }
            let Some(point) = self.cluster_point_of(feature)? else {
                trace!(id = %feature.id, "no cluster point; feature cannot seed a cluster");
                continue;
            };

            let mut extent = Extent::empty();
            extent.extend_point(point);
            let extent = extent.buffer(map_distance);

            let neighbors: Vec<&Feature> = self
                .source
                .features_in_extent(&extent)
                .into_iter()
                .filter(|n| clustered.insert(n.id))
                .collect();

            if let Some(cluster) = self.create_cluster(&neighbors)? {
                clusters.push(cluster);
            }
        }
        Ok(clusters)
    }

    #[allow(clippy::cast_precision_loss)]
    fn create_cluster(&self, neighbors: &[&Feature]) -> Result<Option<Cluster>, ClusterError> {
        let mut points = Vec::with_capacity(neighbors.len());
        let mut members = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            if let Some(p) = self.cluster_point_of(neighbor)? {
                points.push(p);
                members.push((*neighbor).clone());
            }
        }
        if members.is_empty() {
            trace!(candidates = neighbors.len(), "no member has a cluster point; cluster dropped");
            return Ok(None);
        }

        // Summation order affects the last bit of the centroid: back to front.
        let mut sum = Point::default();
        for p in points.iter().rev() {
            sum.x += p.x;
            sum.y += p.y;
        }
        let scale = 1.0 / members.len() as f64;
        let point = Point::new(sum.x * scale, sum.y * scale);

        let ids = members.iter().map(|m| Value::String(m.id.to_string())).collect();
        let feature = Feature::new(Some(Geometry::Point(point))).with_property(CLUSTER_MEMBERS_KEY, Value::Array(ids));
        Ok(Some(Cluster { feature, point, members }))
    }

    fn cluster_point_of(&self, feature: &Feature) -> Result<Option<Point>, ClusterError> {
        if let Some(f) = &self.cluster_point {
            return Ok(f(feature));
        }
        match &feature.geometry {
            Some(Geometry::Point(p)) => Ok(Some(*p)),
            Some(other) => Err(ClusterError::UnsupportedGeometry { id: feature.id, kind: other.kind() }),
            None => Err(ClusterError::UnsupportedGeometry { id: feature.id, kind: "missing" }),
        }
    }
}

/// Mutable borrow of a [`ClusterEngine`]'s source, returned by
/// [`ClusterEngine::source_mut`].
pub struct SourceMut<'a, S: FeatureSource> {
    engine: &'a mut ClusterEngine<S>,
    committed: bool,
}

impl<S: FeatureSource> SourceMut<'_, S> {
    /// Release the source and rebuild if it changed.
    ///
    /// # Errors
    ///
    /// See [`ClusterEngine::load_features`]. The engine stays stale, so the
    /// next load retries the build.
    pub fn commit(mut self) -> Result<(), ClusterError> {
        self.committed = true;
        self.engine.refresh_if_stale()
    }
}

impl<S: FeatureSource> Deref for SourceMut<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.engine.source
    }
}

impl<S: FeatureSource> DerefMut for SourceMut<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.engine.source
    }
}

impl<S: FeatureSource> Drop for SourceMut<'_, S> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(err) = self.engine.refresh_if_stale() {
            warn!(%err, "rebuild after source edit failed; keeping previous cluster set");
        }
    }
}
