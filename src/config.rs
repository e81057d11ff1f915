//! Map configuration parsed from environment variables.

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_CLUSTER_DISTANCE_PX, DEFAULT_CLUSTER_RADIUS_PX, DEFAULT_HIT_TOLERANCE_PX, DEFAULT_RENDER_BUFFER_PX,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} (expected a non-negative number)")]
    Invalid { var: &'static str, value: String },
}

/// Pixel-space tuning shared by every layer of a map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Features closer than this many pixels are clustered together.
    pub cluster_distance_px: f64,
    /// Radius of a drawn cluster circle, also its hit radius.
    pub cluster_radius_px: f64,
    /// Extra pixels around a query point that still count as a hit.
    pub hit_tolerance_px: f64,
    /// Pixels beyond the viewport that cluster layers load features for.
    pub render_buffer_px: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            cluster_distance_px: DEFAULT_CLUSTER_DISTANCE_PX,
            cluster_radius_px: DEFAULT_CLUSTER_RADIUS_PX,
            hit_tolerance_px: DEFAULT_HIT_TOLERANCE_PX,
            render_buffer_px: DEFAULT_RENDER_BUFFER_PX,
        }
    }
}

impl MapConfig {
    /// Build config from environment variables. Every variable is optional:
    /// - `MAP_CLUSTER_DISTANCE_PX`: default 20
    /// - `MAP_CLUSTER_RADIUS_PX`: default 10
    /// - `MAP_HIT_TOLERANCE_PX`: default 0
    /// - `MAP_RENDER_BUFFER_PX`: default 100
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a value that is not a finite,
    /// non-negative number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`MapConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`MapConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            cluster_distance_px: parse_px(&lookup, "MAP_CLUSTER_DISTANCE_PX", defaults.cluster_distance_px)?,
            cluster_radius_px: parse_px(&lookup, "MAP_CLUSTER_RADIUS_PX", defaults.cluster_radius_px)?,
            hit_tolerance_px: parse_px(&lookup, "MAP_HIT_TOLERANCE_PX", defaults.hit_tolerance_px)?,
            render_buffer_px: parse_px(&lookup, "MAP_RENDER_BUFFER_PX", defaults.render_buffer_px)?,
        })
    }
}

fn parse_px(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: f64) -> Result<f64, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ConfigError::Invalid { var, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
