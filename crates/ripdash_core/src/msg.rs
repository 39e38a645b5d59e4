//! Inbound events and their JSON wire form.
//!
//! Events are internally tagged by `type`. Field names follow the pipeline's
//! own spelling where it differs (`downloaded_bytes`, `speed_display`,
//! `eta`), and numeric telemetry is lenient: a field that is not a usable
//! number is dropped on its own instead of failing the whole event.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::state::{JobId, JobStatus, StepRecord};
use crate::EventParseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    /// A job entered the queue.
    Queued {
        #[serde(alias = "job")]
        item: JobRecord,
    },
    /// Metadata for a job became known.
    Meta {
        id: JobId,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        provider: Option<String>,
        #[serde(default)]
        kind: Option<String>,
    },
    /// The pipeline entered a new (free-text) stage.
    Status { id: JobId, label: String },
    /// Download telemetry.
    Progress {
        id: JobId,
        #[serde(flatten)]
        sample: ProgressSample,
    },
    /// A pipeline step finished.
    Step {
        id: JobId,
        step: String,
        ok: bool,
        #[serde(default)]
        detail: Option<String>,
        #[serde(default, deserialize_with = "lenient_number")]
        duration: Option<f64>,
    },
    /// The job finished and produced these files.
    Done {
        id: JobId,
        #[serde(default)]
        paths: Vec<String>,
        #[serde(default, deserialize_with = "lenient_number")]
        duration: Option<f64>,
    },
    /// The job failed.
    Error {
        id: JobId,
        #[serde(default)]
        message: String,
        #[serde(default)]
        stage: Option<String>,
    },
}

impl Event {
    /// Parses one JSON event.
    pub fn from_json(line: &str) -> Result<Event, EventParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(EventParseError::Empty);
        }
        Ok(serde_json::from_str(line)?)
    }

    pub fn id(&self) -> &JobId {
        match self {
            Event::Queued { item } => &item.id,
            Event::Meta { id, .. }
            | Event::Status { id, .. }
            | Event::Progress { id, .. }
            | Event::Step { id, .. }
            | Event::Done { id, .. }
            | Event::Error { id, .. } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Queued { .. } => "queued",
            Event::Meta { .. } => "meta",
            Event::Status { .. } => "status",
            Event::Progress { .. } => "progress",
            Event::Step { .. } => "step",
            Event::Done { .. } => "done",
            Event::Error { .. } => "error",
        }
    }
}

/// One download telemetry sample.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressSample {
    #[serde(
        default,
        alias = "total_bytes",
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total: Option<f64>,
    /// Used when no exact total is known.
    #[serde(
        default,
        rename = "total_bytes_estimate",
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_estimate: Option<f64>,
    #[serde(
        default,
        alias = "downloaded_bytes",
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub downloaded: Option<f64>,
    /// Preformatted speed, shown verbatim.
    #[serde(
        default,
        alias = "speed_display",
        alias = "speedText",
        skip_serializing_if = "Option::is_none"
    )]
    pub speed_text: Option<String>,
    /// Raw rate in bytes per second.
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub speed: Option<f64>,
    #[serde(
        default,
        alias = "eta",
        alias = "etaSeconds",
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub eta_seconds: Option<f64>,
}

impl ProgressSample {
    /// Downloaded fraction, when both byte counts are usable.
    pub fn fraction(&self) -> Option<f64> {
        let total = self.total.or(self.total_estimate)?;
        let downloaded = self.downloaded?;
        (total > 0.0 && downloaded >= 0.0).then(|| (downloaded / total).clamp(0.0, 1.0))
    }

    pub fn is_empty(&self) -> bool {
        self == &ProgressSample::default()
    }
}

/// A job as described by the pipeline: the payload of `queued` and one
/// entry of a state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    /// Last raw status label.
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub progress: ProgressSample,
    #[serde(default)]
    pub steps: BTreeMap<String, StepRecord>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobRecord {
    pub fn new(id: impl Into<JobId>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            status: None,
            title: None,
            provider: None,
            kind: None,
            current: None,
            progress: ProgressSample::default(),
            steps: BTreeMap::new(),
            paths: Vec::new(),
            error: None,
        }
    }
}

/// Full state as served to late subscribers: `{"items": [...]}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub items: Vec<JobRecord>,
}

/// Anything that can arrive on the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Event(Event),
    Snapshot(StateSnapshot),
}

impl Inbound {
    /// Parses one line of the feed: either an event or a state snapshot.
    pub fn from_json(line: &str) -> Result<Inbound, EventParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(EventParseError::Empty);
        }
        let value: Value = serde_json::from_str(line)?;
        if value.get("type").is_none() && value.get("items").is_some() {
            return Ok(Inbound::Snapshot(serde_json::from_value(value)?));
        }
        Ok(Inbound::Event(serde_json::from_value(value)?))
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|value| match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|number| number.is_finite()))
}
