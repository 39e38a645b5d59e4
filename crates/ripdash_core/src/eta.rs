//! Remaining-time estimation.
//!
//! Two estimators convert a per-weight-unit rate into seconds for the
//! remaining weight of the job:
//!
//! * the live estimator derives the rate from the downloader's own ETA while
//!   the download stage is active;
//! * the historical estimator derives it from the durations of stages that
//!   already finished.
//!
//! The chosen estimate is then anchored on the job with a debounce, and the
//! anchor expires when nothing refreshes it for long enough. Readers count
//! the anchor down locally.

use std::time::Duration;

use crate::layout::StageModel;
use crate::progress::ProgressBreakdown;
use crate::state::JobState;
use crate::telemetry::Stamped;
use crate::Stage;

// Floor for the remaining download weight, so a nearly finished download
// cannot blow the rate up.
const MIN_REMAINING_DOWNLOAD_WEIGHT: f64 = 0.01;

/// Seconds left for the whole job, scaled from the downloader's ETA.
pub fn live_estimate(progress: &ProgressBreakdown, eta_live_secs: f64) -> f64 {
    let remaining_download = ((1.0 - progress.step_fraction) * progress.step_weight)
        .max(MIN_REMAINING_DOWNLOAD_WEIGHT);
    let per_weight = eta_live_secs / remaining_download;
    per_weight * progress.remaining_weight()
}

/// Seconds left for the whole job, scaled from recorded stage durations.
///
/// Returns `None` until at least one stage has a positive recorded duration.
pub fn historical_estimate(
    state: &JobState,
    model: &StageModel,
    progress: &ProgressBreakdown,
) -> Option<f64> {
    let (seconds, weight) = state
        .stage_durations()
        .iter()
        .filter(|(_, secs)| **secs > 0.0)
        .fold((0.0, 0.0), |(seconds, weight), (stage, secs)| {
            (seconds + secs, weight + model.weight(*stage))
        });
    if seconds <= 0.0 || weight <= 0.0 {
        return None;
    }
    Some(seconds / weight * progress.remaining_weight())
}

/// Picks the live estimator while downloading with a fresh live ETA,
/// otherwise falls back to the historical one.
pub fn estimate(
    state: &JobState,
    model: &StageModel,
    progress: &ProgressBreakdown,
    now: Duration,
    live_max_age: Duration,
) -> Option<f64> {
    let live = state
        .live_eta(now, live_max_age)
        .filter(|_| state.current_stage() == Some(Stage::Download));
    match live {
        Some(eta) => Some(live_estimate(progress, eta)),
        None => historical_estimate(state, model, progress),
    }
}

/// Applies a raw estimate to the job's anchored ETA.
///
/// A new value replaces the anchor only when the previous anchor is older
/// than `debounce`. An anchor older than `expiry` is dropped.
pub(crate) fn refresh_anchor(
    state: &mut JobState,
    raw: Option<f64>,
    now: Duration,
    debounce: Duration,
    expiry: Duration,
) {
    if let Some(raw) = raw.filter(|secs| secs.is_finite() && *secs >= 0.0) {
        let accept = state
            .eta_overall
            .as_ref()
            .is_none_or(|anchor| anchor.age(now) > debounce);
        if accept {
            state.eta_overall = Some(Stamped::new(raw, now));
        }
    }
    if state
        .eta_overall
        .as_ref()
        .is_some_and(|anchor| anchor.age(now) > expiry)
    {
        state.eta_overall = None;
    }
}

/// Seconds left at `now`: the anchored estimate minus the time elapsed since
/// it was anchored, floored at zero. Unknown once the anchor has expired.
pub fn remaining(state: &JobState, now: Duration, expiry: Duration) -> Option<f64> {
    let anchor = state.eta_overall.as_ref()?;
    let elapsed = anchor.age(now);
    if elapsed > expiry {
        return None;
    }
    Some((anchor.value() - elapsed.as_secs_f64()).max(0.0))
}
