//! Ripdash core: turns a stream of loosely worded pipeline events into
//! stable per-job progress, stage markers and time-remaining estimates.
mod clock;
mod config;
mod error;
pub mod eta;
mod layout;
mod msg;
pub mod progress;
mod registry;
mod stage;
mod state;
mod telemetry;
mod update;
mod view_model;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, SpeedUnit};
pub use error::{ConfigError, EventParseError};
pub use layout::{max_tick_gap, tick_positions, StageModel, StageWeights, DEFAULT_MIN_TICK_GAP};
pub use msg::{Event, Inbound, JobRecord, ProgressSample, StateSnapshot};
pub use progress::{breakdown, overall, ProgressBreakdown};
pub use registry::{JobKey, JobRegistry};
pub use stage::{classify, Stage};
pub use state::{Job, JobId, JobState, JobStatus, StepRecord};
pub use telemetry::Stamped;
pub use view_model::{format_duration, format_step, DashboardView, JobView, StageTickView};
