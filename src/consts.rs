//! Shared numeric constants for the map crate.

// ── Clustering ──────────────────────────────────────────────────

/// Minimum distance between cluster centers, in screen pixels.
pub const DEFAULT_CLUSTER_DISTANCE_PX: f64 = 20.0;

/// Attribute key on a cluster feature holding its ordered member ids.
pub const CLUSTER_MEMBERS_KEY: &str = "features";

// ── Rendering ───────────────────────────────────────────────────

/// Radius of a drawn cluster marker, in screen pixels.
pub const DEFAULT_CLUSTER_RADIUS_PX: f64 = 10.0;

/// Extra screen pixels around the viewport for which features are loaded.
pub const DEFAULT_RENDER_BUFFER_PX: f64 = 100.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for feature queries.
pub const DEFAULT_HIT_TOLERANCE_PX: f64 = 0.0;

// ── Projection ──────────────────────────────────────────────────

/// Projection code used when the host does not name one.
pub const DEFAULT_PROJECTION_CODE: &str = "EPSG:3857";
