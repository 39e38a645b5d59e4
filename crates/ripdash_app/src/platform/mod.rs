mod app;
mod input;
mod settings;
mod ui;

use ripdash_core::Inbound;

pub(crate) use app::run_app;

/// Messages handled by the main loop.
#[derive(Debug)]
pub(crate) enum Msg {
    /// One parsed line of the event feed.
    Feed(Inbound),
    /// Redraw changed jobs.
    Tick,
    /// The feed is exhausted.
    InputClosed,
}
