use thiserror::Error;

use crate::Stage;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("weight for stage {stage} must be a positive finite number, got {value}")]
    InvalidWeight { stage: Stage, value: f64 },
    #[error("minimum tick gap {gap} cannot fit {count} stages on a 0..=100 axis")]
    InvalidTickGap { gap: f64, count: usize },
    #[error("{name} must be a non-negative, representable number of seconds, got {value}")]
    InvalidWindow { name: &'static str, value: f64 },
    #[error("eta expiry ({expiry}s) must not be shorter than the eta debounce ({debounce}s)")]
    ExpiryBeforeDebounce { debounce: f64, expiry: f64 },
}

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("empty event line")]
    Empty,
    #[error("malformed event: {0}")]
    Json(#[from] serde_json::Error),
}
