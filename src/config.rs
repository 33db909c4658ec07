// Engine configuration
// Defaults match the planetarium front end; `.env` and PLANETARIUM_* variables override them

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::label_lod::LabelLodPolicy;
use crate::orbit_solver::{DEFAULT_DISTANCE_SCALE, DEFAULT_ORBIT_SEGMENTS};

/// Hard ceiling for any body's trail buffer
pub const MAX_TRAIL_LENGTH: usize = 1000;

/// Halo appearance for highlighted / normal bodies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HighlightStyle {
    pub highlighted_scale: f64,
    pub highlighted_opacity: f64,
    pub normal_scale: f64,
    pub normal_opacity: f64,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            highlighted_scale: 1.2,
            highlighted_opacity: 0.5,
            normal_scale: 1.0,
            normal_opacity: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Catalog distance units to display units
    pub distance_scale: f64,
    /// Initial trail length for every body, capped at MAX_TRAIL_LENGTH
    pub trail_length: usize,
    /// Initial simulated-time multiplier (days per second in the sample catalog)
    pub time_scale: f64,
    /// Label sprite size before the LOD multiplier
    pub label_base_scale: f64,
    /// Tessellation of the orbit path handed to the renderer
    pub orbit_segments: usize,
    /// Click proxy radius clamp, display units
    pub pick_radius_min: f64,
    pub pick_radius_max: f64,
    pub lod: LabelLodPolicy,
    pub highlight: HighlightStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            distance_scale: DEFAULT_DISTANCE_SCALE,
            trail_length: MAX_TRAIL_LENGTH,
            time_scale: 1.0,
            label_base_scale: 10.0,
            orbit_segments: DEFAULT_ORBIT_SEGMENTS,
            pick_radius_min: 1.0,
            pick_radius_max: 1000.0,
            lod: LabelLodPolicy::default(),
            highlight: HighlightStyle::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults, then `.env`, then process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, test fixtures)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse_var::<f64, _>(&lookup, "PLANETARIUM_DISTANCE_SCALE")? {
            config.distance_scale = require_positive("PLANETARIUM_DISTANCE_SCALE", v)?;
        }
        if let Some(v) = parse_var::<usize, _>(&lookup, "PLANETARIUM_TRAIL_LENGTH")? {
            config.trail_length = v.min(MAX_TRAIL_LENGTH);
        }
        if let Some(v) = parse_var::<f64, _>(&lookup, "PLANETARIUM_TIME_SCALE")? {
            config.time_scale = if v.is_finite() { v.max(0.0) } else { 0.0 };
        }
        if let Some(v) = parse_var::<f64, _>(&lookup, "PLANETARIUM_LABEL_SCALE")? {
            config.label_base_scale = require_positive("PLANETARIUM_LABEL_SCALE", v)?;
        }
        if let Some(v) = parse_var::<usize, _>(&lookup, "PLANETARIUM_ORBIT_SEGMENTS")? {
            config.orbit_segments = v.max(1);
        }

        let lod_edges = (
            parse_var::<f64, _>(&lookup, "PLANETARIUM_LOD_NEAR_MID")?,
            parse_var::<f64, _>(&lookup, "PLANETARIUM_LOD_MID")?,
            parse_var::<f64, _>(&lookup, "PLANETARIUM_LOD_FAR")?,
        );
        if lod_edges != (None, None, None) {
            let bands = config.lod.bands();
            config.lod = LabelLodPolicy::with_thresholds(
                lod_edges.0.unwrap_or(bands[1].lower_bound),
                lod_edges.1.unwrap_or(bands[2].lower_bound),
                lod_edges.2.unwrap_or(bands[3].lower_bound),
            );
        }

        Ok(config)
    }

    pub fn clamped_trail_length(&self) -> usize {
        self.trail_length.min(MAX_TRAIL_LENGTH)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

fn require_positive(key: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be a positive finite number".to_string(),
        })
    }
}
