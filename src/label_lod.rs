// Label LOD Policy - camera distance to label presentation tier

use serde::{Deserialize, Serialize};

/// Label detail, ordered from most to least detailed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LodTier {
    Full,
    Compact,
    Minimal,
}

/// Result of classifying one distance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LodLevel {
    pub tier: LodTier,
    pub scale_multiplier: f64,
}

/// One distance band. A band covers [lower_bound, next band's lower_bound).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LodBand {
    pub lower_bound: f64,
    pub tier: LodTier,
    pub scale_multiplier: f64,
}

/// Four ascending, non-overlapping distance bands covering [0, ∞)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelLodPolicy {
    bands: [LodBand; 4],
}

impl Default for LabelLodPolicy {
    fn default() -> Self {
        Self::with_thresholds(50.0, 200.0, 1000.0)
    }
}

impl LabelLodPolicy {
    /// Build the standard tiering with custom band edges (display units).
    /// Edges are sorted so the bands stay ascending whatever order they arrive in.
    pub fn with_thresholds(near_mid: f64, mid: f64, far: f64) -> Self {
        let mut edges = [near_mid, mid, far].map(|e| if e.is_finite() { e.max(0.0) } else { 0.0 });
        edges.sort_by(f64::total_cmp);

        Self {
            bands: [
                LodBand {
                    lower_bound: 0.0,
                    tier: LodTier::Full,
                    scale_multiplier: 0.6,
                },
                LodBand {
                    lower_bound: edges[0],
                    tier: LodTier::Full,
                    scale_multiplier: 0.8,
                },
                LodBand {
                    lower_bound: edges[1],
                    tier: LodTier::Compact,
                    scale_multiplier: 1.0,
                },
                LodBand {
                    lower_bound: edges[2],
                    tier: LodTier::Minimal,
                    scale_multiplier: 1.2,
                },
            ],
        }
    }

    pub fn bands(&self) -> &[LodBand; 4] {
        &self.bands
    }

    /// Pick the last band whose lower bound the distance has reached.
    /// NaN is treated as infinitely far.
    pub fn classify(&self, distance: f64) -> LodLevel {
        let distance = if distance.is_nan() { f64::INFINITY } else { distance };

        let band = self
            .bands
            .iter()
            .rev()
            .find(|band| distance >= band.lower_bound)
            .unwrap_or(&self.bands[0]);

        LodLevel {
            tier: band.tier,
            scale_multiplier: band.scale_multiplier,
        }
    }
}
