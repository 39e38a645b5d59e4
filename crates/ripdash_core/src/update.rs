use std::time::Duration;

use ripdash_logging::job_debug;

use crate::classify;
use crate::config::EngineConfig;
use crate::eta;
use crate::layout::StageModel;
use crate::msg::{Event, JobRecord, ProgressSample};
use crate::progress::breakdown;
use crate::state::{Job, JobStatus, StepRecord};
use crate::telemetry::Stamped;

/// Everything an event handler may read besides the job itself.
pub(crate) struct Context<'a> {
    pub config: &'a EngineConfig,
    pub model: &'a StageModel,
    pub now: Duration,
}

/// What applying an event did to the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Unchanged,
    Changed,
    /// The job just reached a terminal status.
    Finished,
}

/// Applies one event to its job and recomputes the derived numbers.
///
/// Never fails: unusable fields are skipped and duplicate terminal events
/// are ignored.
pub(crate) fn apply(job: &mut Job, event: Event, ctx: &Context<'_>) -> Outcome {
    let outcome = match event {
        Event::Queued { item } => {
            merge_record(job, item);
            Outcome::Changed
        }
        Event::Meta {
            title,
            provider,
            kind,
            ..
        } => {
            set_if_present(&mut job.title, title);
            set_if_present(&mut job.provider, provider);
            set_if_present(&mut job.kind, kind);
            mark_running(job);
            Outcome::Changed
        }
        Event::Status { label, .. } => {
            mark_running(job);
            match classify(&label) {
                Some(stage) => {
                    if !job.state.advance_to(stage) {
                        job_debug!(job.id, "stale stage {} ignored (label {:?})", stage, label);
                    }
                }
                None => job_debug!(job.id, "unclassified stage label {:?}", label),
            }
            job.stage_label = Some(label);
            Outcome::Changed
        }
        Event::Progress { sample, .. } => {
            apply_progress(job, sample, ctx);
            Outcome::Changed
        }
        Event::Step {
            step,
            ok,
            detail,
            duration,
            ..
        } => {
            if ok {
                match classify(&step) {
                    Some(stage) => job.state.mark_completed(stage, duration),
                    None => job_debug!(job.id, "step {:?} maps to no stage", step),
                }
            } else {
                job.step_failed = true;
                if job.status != JobStatus::Error {
                    job.error = Some(detail.clone().unwrap_or_else(|| format!("{step} failed")));
                }
            }
            job.record_step(StepRecord {
                label: step,
                ok,
                detail,
                duration,
            });
            Outcome::Changed
        }
        Event::Done {
            paths, duration, ..
        } => {
            if job.status.is_terminal() {
                job_debug!(job.id, "duplicate terminal event (done) ignored");
                return Outcome::Unchanged;
            }
            job.status = JobStatus::Done;
            job.paths = paths;
            job.total_duration = duration.filter(|secs| *secs >= 0.0);
            Outcome::Finished
        }
        Event::Error { message, stage, .. } => {
            if job.status.is_terminal() {
                job_debug!(job.id, "duplicate terminal event (error) ignored");
                return Outcome::Unchanged;
            }
            job.status = JobStatus::Error;
            job.error = Some(message);
            job.error_stage = stage.filter(|stage| !stage.is_empty());
            Outcome::Finished
        }
    };

    job.updated_at = ctx.now;
    recompute(job, ctx);
    outcome
}

fn apply_progress(job: &mut Job, sample: ProgressSample, ctx: &Context<'_>) {
    match sample.fraction() {
        Some(fraction) => job.state.set_download_fraction(fraction),
        None => job_debug!(job.id, "progress without usable byte counts"),
    }

    let speed_text = sample
        .speed_text
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
        .or_else(|| {
            sample
                .speed
                .filter(|bps| *bps >= 0.0)
                .map(|bps| ctx.config.speed_unit.format(bps))
        });
    if let Some(text) = speed_text {
        job.state.speed = Some(Stamped::new(text, ctx.now));
    }

    if let Some(eta) = sample.eta_seconds.filter(|secs| *secs >= 0.0) {
        job.state.eta_live = Some(Stamped::new(eta, ctx.now));
    }
}

fn recompute(job: &mut Job, ctx: &Context<'_>) {
    match job.status {
        JobStatus::Done => {
            job.state.overall_fraction = 1.0;
            job.state.clear_telemetry();
        }
        // The last overall value stays as it was when the job failed.
        JobStatus::Error => job.state.clear_telemetry(),
        JobStatus::Queued | JobStatus::Running => {
            let progress = breakdown(&job.state, ctx.model);
            job.state.overall_fraction = progress.fraction();
            let raw = eta::estimate(
                &job.state,
                ctx.model,
                &progress,
                ctx.now,
                ctx.config.eta_expiry(),
            );
            eta::refresh_anchor(
                &mut job.state,
                raw,
                ctx.now,
                ctx.config.eta_debounce(),
                ctx.config.eta_expiry(),
            );
        }
    }
}

/// Fills descriptive fields from a queued record without touching progress.
fn merge_record(job: &mut Job, record: JobRecord) {
    if !record.url.is_empty() {
        job.url = record.url;
    }
    set_if_present(&mut job.title, record.title);
    set_if_present(&mut job.provider, record.provider);
    set_if_present(&mut job.kind, record.kind);
}

fn mark_running(job: &mut Job) {
    if !job.status.is_terminal() {
        job.status = JobStatus::Running;
    }
}

fn set_if_present(slot: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value.filter(|value| !value.trim().is_empty()) {
        *slot = Some(value);
    }
}
