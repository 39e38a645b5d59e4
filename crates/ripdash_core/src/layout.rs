//! Stage weights and the derived marker layout on a 0..=100 axis.
//!
//! Weights drive all progress math. Tick positions are a display-only
//! derivative: they start from the weight-proportional offsets and are then
//! relaxed so that adjacent markers are never closer than a minimum gap.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Stage};

pub const DEFAULT_MIN_TICK_GAP: f64 = 6.0;

/// Relative expected cost of each canonical stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageWeights {
    pub metadata: f64,
    pub resolve: f64,
    pub download: f64,
    pub remux: f64,
    pub tagging: f64,
    pub saved: f64,
}

impl Default for StageWeights {
    fn default() -> Self {
        Self {
            metadata: 0.6,
            resolve: 0.7,
            download: 3.6,
            remux: 1.4,
            tagging: 1.0,
            saved: 0.6,
        }
    }
}

impl StageWeights {
    pub fn weight(&self, stage: Stage) -> f64 {
        match stage {
            Stage::Metadata => self.metadata,
            Stage::Resolve => self.resolve,
            Stage::Download => self.download,
            Stage::Remux => self.remux,
            Stage::Tagging => self.tagging,
            Stage::Saved => self.saved,
        }
    }

    pub fn to_array(&self) -> [f64; Stage::COUNT] {
        Stage::ALL.map(|stage| self.weight(stage))
    }

    pub fn total(&self) -> f64 {
        self.to_array().iter().sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for stage in Stage::ALL {
            let value = self.weight(stage);
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidWeight { stage, value });
            }
        }
        Ok(())
    }
}

/// Computes marker positions for each stage.
///
/// The result is non-decreasing, starts at 0, ends at 100, and keeps every
/// adjacent pair at least `min_gap` apart as long as the gap fits the axis.
pub fn tick_positions(weights: &StageWeights, min_gap: f64) -> [f64; Stage::COUNT] {
    let weights = weights.to_array();
    let total: f64 = weights.iter().sum();
    let last = Stage::COUNT - 1;

    let mut positions = [0.0; Stage::COUNT];
    let mut cumulative = 0.0;
    for (position, weight) in positions.iter_mut().zip(weights) {
        *position = if total > 0.0 {
            cumulative / total * 100.0
        } else {
            0.0
        };
        cumulative += weight;
    }
    positions[last] = 100.0;

    // Forward: push markers that crowd their predecessor outward.
    for i in 1..Stage::COUNT {
        if positions[i] - positions[i - 1] < min_gap {
            positions[i] = positions[i - 1] + min_gap;
        }
    }

    // Backward: pull the tail back under 100 and re-open the gaps from the end.
    if positions[last] > 100.0 {
        positions[last] = 100.0;
    }
    for i in (0..last).rev() {
        if positions[i + 1] - positions[i] < min_gap {
            positions[i] = positions[i + 1] - min_gap;
        }
    }

    positions[0] = 0.0;
    positions[last] = 100.0;
    positions.map(|p| p.clamp(0.0, 100.0))
}

/// Largest minimum gap that still lets every stage fit on the axis.
pub fn max_tick_gap() -> f64 {
    100.0 / (Stage::COUNT - 1) as f64
}

/// Immutable weight table plus its precomputed tick layout.
#[derive(Debug, Clone, PartialEq)]
pub struct StageModel {
    weights: [f64; Stage::COUNT],
    total: f64,
    ticks: [f64; Stage::COUNT],
}

impl StageModel {
    pub fn new(weights: &StageWeights, min_gap: f64) -> Result<Self, ConfigError> {
        weights.validate()?;
        if !min_gap.is_finite() || min_gap < 0.0 || min_gap > max_tick_gap() {
            return Err(ConfigError::InvalidTickGap {
                gap: min_gap,
                count: Stage::COUNT,
            });
        }
        Ok(Self {
            weights: weights.to_array(),
            total: weights.total(),
            ticks: tick_positions(weights, min_gap),
        })
    }

    pub fn weight(&self, stage: Stage) -> f64 {
        self.weights[stage.index()]
    }

    pub fn total_weight(&self) -> f64 {
        self.total
    }

    /// Sum of the weights of every stage up to and including `stage`.
    pub fn weight_through(&self, stage: Option<Stage>) -> f64 {
        match stage {
            Some(stage) => self.weights[..=stage.index()].iter().sum(),
            None => 0.0,
        }
    }

    pub fn tick(&self, stage: Stage) -> f64 {
        self.ticks[stage.index()]
    }

    pub fn ticks(&self) -> &[f64; Stage::COUNT] {
        &self.ticks
    }
}
