//! Features: an id, an optional geometry, and an open-ended attribute bag.
//!
//! Features flow in from the host (usually deserialized from JSON) and are
//! owned by exactly one source. Cluster features are synthesized fresh by
//! [`crate::cluster`] and never alias source features.

#[cfg(test)]
#[path = "feature_test.rs"]
mod feature_test;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::geom::{Extent, Point};

/// Unique identifier for a feature.
pub type FeatureId = Uuid;

/// Geometry of a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates", rename_all = "lowercase")]
pub enum Geometry {
    /// A single position.
    Point(Point),
    /// An open polyline.
    LineString(Vec<Point>),
    /// Outer ring followed by any holes.
    Polygon(Vec<Vec<Point>>),
}

impl Geometry {
    /// Bounding box of all coordinates. Empty for a geometry with no coordinates.
    #[must_use]
    pub fn extent(&self) -> Extent {
        match self {
            Self::Point(p) => Extent::from_point(*p),
            Self::LineString(points) => Extent::from_points(points),
            Self::Polygon(rings) => Extent::from_points(rings.iter().flatten()),
        }
    }

    /// The position of a `Point` geometry; `None` for every other kind.
    #[must_use]
    pub fn as_point(&self) -> Option<Point> {
        match self {
            Self::Point(p) => Some(*p),
            Self::LineString(_) | Self::Polygon(_) => None,
        }
    }

    /// Lowercase kind name, as used on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Point(_) => "point",
            Self::LineString(_) => "linestring",
            Self::Polygon(_) => "polygon",
        }
    }
}

/// A map feature as stored in a source and on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Stable unique identifier.
    pub id: FeatureId,
    /// Geometry in world coordinates, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    /// Open-ended attributes (name, category, counts, etc.).
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Feature {
    /// New feature with a fresh random id and no attributes.
    #[must_use]
    pub fn new(geometry: Option<Geometry>) -> Self {
        Self { id: Uuid::new_v4(), geometry, properties: Map::new() }
    }

    /// Shorthand for a point feature with a fresh id.
    #[must_use]
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(Some(Geometry::Point(Point::new(x, y))))
    }

    #[must_use]
    pub fn with_id(mut self, id: FeatureId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Look up an attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Insert or replace an attribute, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.properties.insert(key.into(), value)
    }

    /// Bounding box of the geometry, or [`Extent::empty`] without one.
    #[must_use]
    pub fn extent(&self) -> Extent {
        self.geometry.as_ref().map_or_else(Extent::empty, Geometry::extent)
    }

    /// The position of a point geometry, if this feature has one.
    #[must_use]
    pub fn point_geometry(&self) -> Option<Point> {
        self.geometry.as_ref().and_then(Geometry::as_point)
    }
}
