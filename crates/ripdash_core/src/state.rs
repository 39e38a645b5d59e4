use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::Stamped;
use crate::Stage;

/// Opaque job identifier assigned by the upstream pipeline.
///
/// Numeric ids on the wire are accepted and kept in their decimal form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "RawJobId", into = "String")]
pub struct JobId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawJobId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl From<RawJobId> for JobId {
    fn from(raw: RawJobId) -> Self {
        match raw {
            RawJobId::Text(text) => Self(text),
            RawJobId::Signed(number) => Self(number.to_string()),
            RawJobId::Unsigned(number) => Self(number.to_string()),
            // `3.0` displays as `3`, so it names the same job as `3`.
            RawJobId::Float(number) => Self(number.to_string()),
        }
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

/// Stage bookkeeping and telemetry for a single job.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobState {
    current: Option<Stage>,
    completed: Option<Stage>,
    download_fraction: f64,
    pub(crate) speed: Option<Stamped<String>>,
    pub(crate) eta_live: Option<Stamped<f64>>,
    pub(crate) eta_overall: Option<Stamped<f64>>,
    stage_durations: BTreeMap<Stage, f64>,
    pub(crate) overall_fraction: f64,
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_stage(&self) -> Option<Stage> {
        self.current
    }

    /// Highest stage signalled as complete, as recorded (not clamped).
    pub fn completed_stage(&self) -> Option<Stage> {
        self.completed
    }

    /// Completed stage as used for display math: never beyond the stage
    /// right before the active one.
    pub fn effective_completed(&self) -> Option<Stage> {
        let cap = self.current?.prev()?;
        self.completed.map(|completed| completed.min(cap))
    }

    pub fn download_fraction(&self) -> f64 {
        self.download_fraction
    }

    pub fn overall_fraction(&self) -> f64 {
        self.overall_fraction
    }

    pub fn stage_duration(&self, stage: Stage) -> Option<f64> {
        self.stage_durations.get(&stage).copied()
    }

    pub fn stage_durations(&self) -> &BTreeMap<Stage, f64> {
        &self.stage_durations
    }

    /// Moves the active-stage pointer forward to `stage`.
    ///
    /// Stale or duplicate stages (not past the current one) leave the
    /// pointer alone and return `false`. Every stage skipped on the way is
    /// implicitly completed.
    pub fn advance_to(&mut self, stage: Stage) -> bool {
        if self.current.is_some_and(|current| stage <= current) {
            return false;
        }
        self.current = Some(stage);
        if let Some(prev) = stage.prev() {
            self.raise_completed(prev);
        }
        true
    }

    /// Records `stage` as complete, with its observed duration if known.
    ///
    /// The completed pointer only ever rises. A positive finite duration
    /// replaces any earlier one for that stage.
    pub fn mark_completed(&mut self, stage: Stage, duration_secs: Option<f64>) {
        self.raise_completed(stage);
        if let Some(secs) = duration_secs.filter(|secs| secs.is_finite() && *secs > 0.0) {
            self.stage_durations.insert(stage, secs);
        }
    }

    pub fn speed_text(&self, now: Duration, stale_after: Duration) -> Option<&str> {
        self.speed
            .as_ref()
            .and_then(|speed| speed.fresh(now, stale_after))
            .map(String::as_str)
    }

    pub fn live_eta(&self, now: Duration, stale_after: Duration) -> Option<f64> {
        self.eta_live
            .as_ref()
            .and_then(|eta| eta.fresh(now, stale_after))
            .copied()
    }

    pub fn set_download_fraction(&mut self, fraction: f64) {
        self.download_fraction = fraction.clamp(0.0, 1.0);
    }

    pub(crate) fn clear_telemetry(&mut self) {
        self.speed = None;
        self.eta_live = None;
        self.eta_overall = None;
    }

    fn raise_completed(&mut self, stage: Stage) {
        if self.completed.is_none_or(|completed| stage > completed) {
            self.completed = Some(stage);
        }
    }
}

/// Outcome of one pipeline step, as reported by a `step` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(default)]
    pub label: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// A job as hosted by the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub(crate) id: JobId,
    pub(crate) url: String,
    pub(crate) title: Option<String>,
    pub(crate) provider: Option<String>,
    pub(crate) kind: Option<String>,
    pub(crate) status: JobStatus,
    pub(crate) stage_label: Option<String>,
    pub(crate) steps: Vec<StepRecord>,
    pub(crate) step_failed: bool,
    pub(crate) paths: Vec<String>,
    pub(crate) error: Option<String>,
    pub(crate) error_stage: Option<String>,
    pub(crate) total_duration: Option<f64>,
    pub(crate) state: JobState,
    pub(crate) updated_at: Duration,
}

impl Job {
    pub(crate) fn new(id: JobId, url: impl Into<String>, now: Duration) -> Self {
        Self {
            id,
            url: url.into(),
            title: None,
            provider: None,
            kind: None,
            status: JobStatus::Queued,
            stage_label: None,
            steps: Vec::new(),
            step_failed: false,
            paths: Vec::new(),
            error: None,
            error_stage: None,
            total_duration: None,
            state: JobState::new(),
            updated_at: now,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Title for display, falling back to the URL and then the id.
    pub fn display_title(&self) -> &str {
        match (&self.title, self.url.is_empty()) {
            (Some(title), _) if !title.is_empty() => title.as_str(),
            (_, false) => self.url.as_str(),
            _ => self.id.as_str(),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn stage_label(&self) -> Option<&str> {
        self.stage_label.as_deref()
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn updated_at(&self) -> Duration {
        self.updated_at
    }

    /// Stores a step result, replacing an earlier result with the same label.
    pub(crate) fn record_step(&mut self, step: StepRecord) {
        match self.steps.iter_mut().find(|s| s.label == step.label) {
            Some(existing) => *existing = step,
            None => self.steps.push(step),
        }
    }
}
