#![deny(missing_docs)]
//! Logging for the ripdash dashboard.
//!
//! Process-level messages go through the `dash_*` macros and anything about a
//! single job through `job_*`, which tags the line with `[job <id>]` so one
//! job's history can be grepped out of `ripdash.log`. Both forward to the `log`
//! facade; [`initialize`] wires it to simplelog without touching stdout, which
//! belongs to the rendered rows.

use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// File written by [`LogDestination::File`] and [`LogDestination::Both`].
pub const LOG_FILE: &str = "./ripdash.log";

/// Raw feed lines as they arrive; finer than `--verbose` enables.
#[macro_export]
macro_rules! dash_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Dashboard internals: stage ticks, redraw counts, reader bookkeeping.
#[macro_export]
macro_rules! dash_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Lifecycle milestones of the dashboard process (start, restore, feed end).
#[macro_export]
macro_rules! dash_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Recoverable input problems, e.g. a feed line that could not be parsed.
#[macro_export]
macro_rules! dash_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Failures that end the dashboard, such as a broken output stream.
#[macro_export]
macro_rules! dash_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Logs a debug-level message prefixed with the job it concerns.
///
/// The first argument is anything implementing `Display` (usually a job id).
#[macro_export]
macro_rules! job_debug {
    ($job:expr, $fmt:literal $($arg:tt)*) => {{
        log::debug!(concat!("[job {}] ", $fmt), $job $($arg)*);
    }};
}

/// Logs an info-level message prefixed with the job it concerns.
#[macro_export]
macro_rules! job_info {
    ($job:expr, $fmt:literal $($arg:tt)*) => {{
        log::info!(concat!("[job {}] ", $fmt), $job $($arg)*);
    }};
}

/// Logs a warn-level message prefixed with the job it concerns.
#[macro_export]
macro_rules! job_warn {
    ($job:expr, $fmt:literal $($arg:tt)*) => {{
        log::warn!(concat!("[job {}] ", $fmt), $job $($arg)*);
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogDestination {
    /// Write to `./ripdash.log` in the current directory.
    #[default]
    File,
    /// Write to the terminal (stderr, so stdout stays free for rendering).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

/// Initializes the process logger with the specified destination and level.
///
/// Failing to create the log file is reported on stderr and is not fatal;
/// with [`LogDestination::File`] the process then runs without a logger.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File => match create_file_logger(level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => {
            vec![TermLogger::new(
                level,
                config,
                TerminalMode::Stderr,
                ColorChoice::Auto,
            )]
        }
        LogDestination::Both => {
            let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
                level,
                config.clone(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            )];
            if let Some(file_logger) = create_file_logger(level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    let log_path = PathBuf::from(LOG_FILE);
    match File::create(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}
