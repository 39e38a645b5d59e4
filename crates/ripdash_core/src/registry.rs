use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use ripdash_logging::{dash_debug, job_debug, job_info};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::layout::StageModel;
use crate::msg::{Event, JobRecord, StateSnapshot};
use crate::state::{Job, JobId, JobStatus};
use crate::update::{self, Context, Outcome};
use crate::view_model::{self, DashboardView, JobView};
use crate::{classify, ConfigError};

/// Opaque handle to a job slot in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobKey(usize);

/// Owns every job of the session and routes events to them.
///
/// Jobs are never removed while the registry lives; they only move from the
/// active group to the done group, exactly once.
pub struct JobRegistry {
    config: EngineConfig,
    model: StageModel,
    clock: Arc<dyn Clock>,
    jobs: Vec<Job>,
    index: HashMap<JobId, JobKey>,
    active: Vec<JobKey>,
    done: Vec<JobKey>,
    dirty: BTreeSet<JobKey>,
}

impl fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRegistry")
            .field("jobs", &self.jobs.len())
            .field("active", &self.active.len())
            .field("done", &self.done.len())
            .finish_non_exhaustive()
    }
}

impl JobRegistry {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        let model = config.stage_model()?;
        dash_debug!("stage ticks: {:?}", model.ticks());
        Ok(Self {
            config,
            model,
            clock,
            jobs: Vec::new(),
            index: HashMap::new(),
            active: Vec::new(),
            done: Vec::new(),
            dirty: BTreeSet::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn model(&self) -> &StageModel {
        &self.model
    }

    /// Applies one event. Unknown ids get a queued job synthesized first.
    pub fn submit(&mut self, event: Event) {
        let now = self.clock.now();
        let key = self.resolve(&event);
        let ctx = Context {
            config: &self.config,
            model: &self.model,
            now,
        };
        match update::apply(&mut self.jobs[key.0], event, &ctx) {
            Outcome::Unchanged => {}
            Outcome::Changed => {
                self.dirty.insert(key);
            }
            Outcome::Finished => {
                let job = &self.jobs[key.0];
                job_info!(job.id(), "finished as {:?}", job.status());
                self.move_to_done(key);
                self.dirty.insert(key);
            }
        }
    }

    /// Rebuilds jobs from a state snapshot by replaying equivalent events.
    pub fn restore(&mut self, snapshot: StateSnapshot) {
        for record in snapshot.items {
            for event in replay_events(record) {
                self.submit(event);
            }
        }
    }

    pub fn snapshot(&self, id: &JobId) -> Option<JobView> {
        self.index.get(id).map(|key| self.view_of(*key))
    }

    /// Views of all jobs, active ones first, each group in arrival order.
    pub fn snapshot_all(&self) -> Vec<JobView> {
        self.active
            .iter()
            .chain(self.done.iter())
            .map(|key| self.view_of(*key))
            .collect()
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            active: self.active.iter().map(|key| self.view_of(*key)).collect(),
            done: self.done.iter().map(|key| self.view_of(*key)).collect(),
        }
    }

    pub fn key(&self, id: &JobId) -> Option<JobKey> {
        self.index.get(id).copied()
    }

    pub fn get(&self, key: JobKey) -> Option<&Job> {
        self.jobs.get(key.0)
    }

    pub fn job(&self, id: &JobId) -> Option<&Job> {
        self.key(id).and_then(|key| self.get(key))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn active_ids(&self) -> Vec<JobId> {
        self.ids_of(&self.active)
    }

    pub fn done_ids(&self) -> Vec<JobId> {
        self.ids_of(&self.done)
    }

    /// Ids of jobs changed since the last call, in arrival order.
    pub fn consume_dirty(&mut self) -> Vec<JobId> {
        let dirty = std::mem::take(&mut self.dirty);
        dirty
            .into_iter()
            .map(|key| self.jobs[key.0].id().clone())
            .collect()
    }

    fn resolve(&mut self, event: &Event) -> JobKey {
        let id = event.id();
        if let Some(key) = self.index.get(id) {
            return *key;
        }
        let url = match event {
            Event::Queued { item } => item.url.clone(),
            other => {
                job_debug!(id, "no host record for {} event, synthesizing one", other.kind());
                String::new()
            }
        };
        let key = JobKey(self.jobs.len());
        self.jobs.push(Job::new(id.clone(), url, self.clock.now()));
        self.index.insert(id.clone(), key);
        self.active.push(key);
        self.dirty.insert(key);
        key
    }

    fn move_to_done(&mut self, key: JobKey) {
        self.active.retain(|k| *k != key);
        if !self.done.contains(&key) {
            self.done.push(key);
        }
    }

    fn view_of(&self, key: JobKey) -> JobView {
        view_model::job_view(&self.jobs[key.0], &self.model, &self.config, self.clock.now())
    }

    fn ids_of(&self, keys: &[JobKey]) -> Vec<JobId> {
        keys.iter()
            .map(|key| self.jobs[key.0].id().clone())
            .collect()
    }
}

/// The events that would have produced `record` had they been observed live.
fn replay_events(record: JobRecord) -> Vec<Event> {
    let JobRecord {
        id,
        url,
        status,
        title,
        provider,
        kind,
        current,
        progress,
        steps,
        paths,
        error,
    } = record;

    let mut events = vec![Event::Queued {
        item: JobRecord::new(id.clone(), url),
    }];
    if title.is_some() || provider.is_some() || kind.is_some() || status == Some(JobStatus::Running)
    {
        events.push(Event::Meta {
            id: id.clone(),
            title,
            provider,
            kind,
        });
    }

    let mut steps: Vec<_> = steps.into_iter().collect();
    steps.sort_by_key(|(label, _)| classify(label));
    for (label, step) in steps {
        events.push(Event::Step {
            id: id.clone(),
            step: label,
            ok: step.ok,
            detail: step.detail,
            duration: step.duration,
        });
    }

    if let Some(label) = current {
        events.push(Event::Status {
            id: id.clone(),
            label,
        });
    }
    if !progress.is_empty() {
        events.push(Event::Progress {
            id: id.clone(),
            sample: progress,
        });
    }

    match status {
        Some(JobStatus::Done) => events.push(Event::Done {
            id,
            paths,
            duration: None,
        }),
        Some(JobStatus::Error) => events.push(Event::Error {
            id,
            message: error.unwrap_or_default(),
            stage: None,
        }),
        Some(JobStatus::Queued) | Some(JobStatus::Running) | None => {}
    }
    events
}
