use std::time::Duration;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::eta;
use crate::layout::StageModel;
use crate::state::{Job, JobId, JobStatus, StepRecord};
use crate::Stage;

const STEP_LABEL_MAX: usize = 48;
const STEP_DETAIL_MAX: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTickView {
    pub stage: Stage,
    /// Marker offset in percent.
    pub position: f64,
    pub reached: bool,
    pub is_current: bool,
    pub is_next: bool,
}

/// Everything a renderer needs to draw one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
    pub id: JobId,
    pub url: String,
    pub title: String,
    pub provider: Option<String>,
    pub kind: Option<String>,
    pub status: JobStatus,
    /// Last raw label reported by the pipeline.
    pub stage_label: Option<String>,
    pub current_stage: Option<Stage>,
    pub overall_percent: f64,
    pub ticks: Vec<StageTickView>,
    pub speed_text: Option<String>,
    pub eta_seconds: Option<f64>,
    /// `percent · speed · ETA`, each part only when known.
    pub status_line: String,
    pub error_line: Option<String>,
    /// True once the job failed or any of its steps did.
    pub errored: bool,
    pub output_paths: Vec<String>,
    pub step_lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DashboardView {
    pub active: Vec<JobView>,
    pub done: Vec<JobView>,
}

impl DashboardView {
    pub fn job_count(&self) -> usize {
        self.active.len() + self.done.len()
    }
}

pub(crate) fn job_view(
    job: &Job,
    model: &StageModel,
    config: &EngineConfig,
    now: Duration,
) -> JobView {
    let state = job.state();
    let overall_percent = state.overall_fraction() * 100.0;
    let speed_text = state
        .speed_text(now, config.speed_stale_after())
        .map(ToOwned::to_owned);
    let eta_seconds = eta::remaining(state, now, config.eta_expiry());

    JobView {
        id: job.id().clone(),
        url: job.url().to_owned(),
        title: job.display_title().to_owned(),
        provider: job.provider.clone(),
        kind: job.kind.clone(),
        status: job.status(),
        stage_label: job.stage_label.clone(),
        current_stage: state.current_stage(),
        overall_percent,
        ticks: stage_ticks(job, model, overall_percent, config.tick_tolerance),
        status_line: status_line(job, overall_percent, speed_text.as_deref(), eta_seconds),
        speed_text,
        eta_seconds,
        error_line: error_line(job),
        errored: job.status() == JobStatus::Error || job.step_failed,
        output_paths: job.paths().to_vec(),
        step_lines: step_lines(job.steps(), config.max_step_lines),
    }
}

fn stage_ticks(
    job: &Job,
    model: &StageModel,
    overall_percent: f64,
    tolerance: f64,
) -> Vec<StageTickView> {
    let live = !job.status().is_terminal();
    let current = job.state().current_stage();
    let next = match current {
        Some(stage) => stage.next(),
        None => Some(Stage::Metadata),
    };

    Stage::ALL
        .iter()
        .map(|&stage| {
            let position = model.tick(stage);
            StageTickView {
                stage,
                position,
                reached: overall_percent >= position - tolerance,
                is_current: live && current == Some(stage),
                is_next: live && next == Some(stage),
            }
        })
        .collect()
}

fn status_line(job: &Job, percent: f64, speed: Option<&str>, eta: Option<f64>) -> String {
    let mut parts = vec![format!("{percent:.1}%")];
    if let Some(speed) = speed {
        parts.push(speed.to_owned());
    }
    if let Some(eta) = eta {
        parts.push(format!("ETA {}", format_duration(eta)));
    }
    if let Some(total) = job.total_duration {
        parts.push(format!("took {}", format_duration(total)));
    }
    parts.join(" · ")
}

fn error_line(job: &Job) -> Option<String> {
    let message = job.error()?;
    Some(match &job.error_stage {
        Some(stage) => format!("{stage}: {message}"),
        None => message.to_owned(),
    })
}

fn step_lines(steps: &[StepRecord], max: usize) -> Vec<String> {
    let skip = steps.len().saturating_sub(max);
    steps.iter().skip(skip).map(format_step).collect()
}

/// Renders one step result, e.g. `OK Download · 00:12`.
pub fn format_step(step: &StepRecord) -> String {
    let badge = if step.ok { "OK" } else { "FAIL" };
    let mut line = format!("{badge} {}", shorten(&step.label, STEP_LABEL_MAX));
    if let Some(duration) = step.duration {
        line.push_str(" · ");
        line.push_str(&format_duration(duration));
    }
    if let Some(detail) = step.detail.as_deref().filter(|d| show_detail(step, d)) {
        line.push_str(" · ");
        line.push_str(&shorten(detail, STEP_DETAIL_MAX));
    }
    line
}

fn show_detail(step: &StepRecord, detail: &str) -> bool {
    !step.ok
        || detail.to_lowercase().starts_with("skipped")
        || step.label.eq_ignore_ascii_case("saved")
}

/// Formats seconds as `mm:ss`, or `h:mm:ss` from one hour on.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let (mins, secs) = (total / 60, total % 60);
    let (hours, mins) = (mins / 60, mins % 60);
    if hours > 0 {
        format!("{hours}:{mins:02}:{secs:02}")
    } else {
        format!("{mins:02}:{secs:02}")
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", head.trim_end())
}
