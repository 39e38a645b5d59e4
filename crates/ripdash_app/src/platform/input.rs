//! Event feed reader.
//!
//! Runs on its own thread and forwards every parsed line to the main loop.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use ripdash_core::Inbound;
use ripdash_logging::{dash_info, dash_trace, dash_warn};

use super::Msg;

/// Line counts of one pass over the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FeedStats {
    pub accepted: usize,
    pub skipped: usize,
}

/// Opens the feed (a file, or stdin for `None`) and starts forwarding it.
///
/// The receiver gets [`Msg::InputClosed`] once the feed is exhausted.
pub(crate) fn spawn_reader(
    source: Option<&Path>,
    msg_tx: mpsc::Sender<Msg>,
) -> Result<thread::JoinHandle<()>> {
    let reader: Box<dyn BufRead + Send> = match source {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open event feed {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(io::stdin())),
    };

    Ok(thread::spawn(move || {
        let stats = forward_lines(reader, &msg_tx);
        dash_info!(
            "Event feed closed: {} lines accepted, {} skipped",
            stats.accepted,
            stats.skipped
        );
        let _ = msg_tx.send(Msg::InputClosed);
    }))
}

/// Parses each non-empty line and sends it on. Malformed lines are logged
/// with their 1-based line number and skipped.
pub(crate) fn forward_lines(reader: impl BufRead, msg_tx: &mpsc::Sender<Msg>) -> FeedStats {
    let mut stats = FeedStats::default();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                dash_warn!("Event feed unreadable at line {}: {}", line_no, err);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        dash_trace!("feed line {}: {}", line_no, line);
        match Inbound::from_json(&line) {
            Ok(inbound) => {
                stats.accepted += 1;
                if msg_tx.send(Msg::Feed(inbound)).is_err() {
                    break;
                }
            }
            Err(err) => {
                stats.skipped += 1;
                dash_warn!("Skipping event line {}: {}", line_no, err);
            }
        }
    }
    stats
}
