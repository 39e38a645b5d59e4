use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::layout::{StageModel, StageWeights, DEFAULT_MIN_TICK_GAP};
use crate::ConfigError;

/// How a numeric byte rate is rendered when the pipeline sends no text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpeedUnit {
    /// Megabytes per second.
    #[default]
    MBps,
    /// Megabits per second.
    Mbps,
}

impl SpeedUnit {
    pub fn format(self, bytes_per_sec: f64) -> String {
        let (value, suffix) = match self {
            SpeedUnit::MBps => (bytes_per_sec / 1_000_000.0, "MB/s"),
            SpeedUnit::Mbps => (bytes_per_sec * 8.0 / 1_000_000.0, "Mb/s"),
        };
        format!("{value:.1} {suffix}")
    }
}

/// Engine configuration, injected once at registry construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Relative stage costs used by every progress and ETA computation.
    pub weights: StageWeights,
    /// Minimum distance between adjacent stage markers, in percent.
    pub min_tick_gap: f64,
    /// A marker counts as reached this many percent before its position.
    pub tick_tolerance: f64,
    /// Speed text is blanked once it is older than this.
    pub speed_stale_secs: f64,
    /// A new ETA anchor is only accepted when the previous one is older than this.
    pub eta_debounce_secs: f64,
    /// ETA anchors (and live ETA readings) older than this are treated as unknown.
    pub eta_expiry_secs: f64,
    pub speed_unit: SpeedUnit,
    /// Number of recent step results kept in each job view.
    pub max_step_lines: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: StageWeights::default(),
            min_tick_gap: DEFAULT_MIN_TICK_GAP,
            tick_tolerance: 0.5,
            speed_stale_secs: 8.0,
            eta_debounce_secs: 3.0,
            eta_expiry_secs: 15.0,
            speed_unit: SpeedUnit::default(),
            max_step_lines: 6,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stage_model()?;
        for (name, value) in [
            ("tick_tolerance", self.tick_tolerance),
            ("speed_stale_secs", self.speed_stale_secs),
            ("eta_debounce_secs", self.eta_debounce_secs),
            ("eta_expiry_secs", self.eta_expiry_secs),
        ] {
            if value < 0.0 || Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::InvalidWindow { name, value });
            }
        }
        if self.eta_expiry_secs < self.eta_debounce_secs {
            return Err(ConfigError::ExpiryBeforeDebounce {
                debounce: self.eta_debounce_secs,
                expiry: self.eta_expiry_secs,
            });
        }
        Ok(())
    }

    pub fn stage_model(&self) -> Result<StageModel, ConfigError> {
        StageModel::new(&self.weights, self.min_tick_gap)
    }

    pub fn speed_stale_after(&self) -> Duration {
        window(self.speed_stale_secs)
    }

    pub fn eta_debounce(&self) -> Duration {
        window(self.eta_debounce_secs)
    }

    pub fn eta_expiry(&self) -> Duration {
        window(self.eta_expiry_secs)
    }
}

/// Saturates instead of panicking for windows `validate` would reject.
fn window(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
