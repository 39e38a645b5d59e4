//! Command-line surface of the dashboard.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use ripdash_logging::LogDestination;

#[derive(Debug, Parser)]
#[command(name = "ripdash")]
#[command(about = "Live progress and ETA dashboard for media pipeline events", long_about = None)]
pub struct Cli {
    /// JSON-lines event feed. Reads stdin when omitted or "-".
    #[arg(value_name = "EVENTS")]
    pub events: Option<PathBuf>,

    /// RON engine configuration. Defaults to ./ripdash.ron when present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Redraw interval in milliseconds.
    #[arg(long, default_value = "250", value_name = "N")]
    pub tick_ms: u64,

    /// Where log output goes.
    #[arg(long, value_enum, default_value = "file")]
    pub log: LogTarget,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the effective engine configuration as RON and exit.
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    /// The event source, or `None` for stdin.
    pub fn events_path(&self) -> Option<&PathBuf> {
        self.events.as_ref().filter(|path| path.as_os_str() != "-")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}
