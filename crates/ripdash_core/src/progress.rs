//! Overall completion fraction from stage weights.

use crate::layout::StageModel;
use crate::state::JobState;
use crate::Stage;

/// The weight terms behind an overall fraction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressBreakdown {
    /// Sum of the weights of every (effectively) completed stage.
    pub base_weight: f64,
    /// Weight of the active stage, or 0 when it is already subsumed.
    pub step_weight: f64,
    /// Fraction of the active stage done; only non-zero while downloading.
    pub step_fraction: f64,
    pub total_weight: f64,
}

impl ProgressBreakdown {
    pub fn progress_weight(&self) -> f64 {
        self.base_weight + self.step_fraction * self.step_weight
    }

    pub fn remaining_weight(&self) -> f64 {
        (self.total_weight - self.progress_weight()).max(0.0)
    }

    pub fn fraction(&self) -> f64 {
        if self.total_weight <= 0.0 {
            return 0.0;
        }
        (self.progress_weight() / self.total_weight).clamp(0.0, 1.0)
    }
}

pub fn breakdown(state: &JobState, model: &StageModel) -> ProgressBreakdown {
    let completed = state.effective_completed();
    let base_weight = model.weight_through(completed);

    let active = state
        .current_stage()
        .filter(|current| completed.is_none_or(|completed| completed < *current));
    let step_weight = active.map_or(0.0, |stage| model.weight(stage));
    let step_fraction = match active {
        Some(Stage::Download) => state.download_fraction(),
        _ => 0.0,
    };

    ProgressBreakdown {
        base_weight,
        step_weight,
        step_fraction,
        total_weight: model.total_weight(),
    }
}

/// Overall completion of a job in `[0, 1]`.
pub fn overall(state: &JobState, model: &StageModel) -> f64 {
    breakdown(state, model).fraction()
}
