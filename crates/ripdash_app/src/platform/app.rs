use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use ripdash_core::{Inbound, JobId, JobRegistry, JobView};
use ripdash_logging::{dash_debug, dash_info};

use super::ui::render;
use super::{input, settings, Msg};
use crate::cli::Cli;

pub(crate) fn run_app(cli: Cli) -> Result<()> {
    ripdash_logging::initialize(cli.log.into(), cli.log_level());

    let config = settings::load_config(cli.config.as_deref())?;
    if cli.print_config {
        println!("{}", settings::render_config(&config)?);
        return Ok(());
    }
    let registry = JobRegistry::new(config).context("invalid engine configuration")?;

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    input::spawn_reader(cli.events_path().map(|path| path.as_path()), msg_tx.clone())?;

    // Background tick to throttle rendering.
    let interval = Duration::from_millis(cli.tick_ms.max(1));
    thread::spawn(move || {
        while msg_tx.send(Msg::Tick).is_ok() {
            thread::sleep(interval);
        }
    });

    let stdout = io::stdout();
    let mut dashboard = Dashboard::new(registry, stdout.lock());
    for msg in msg_rx {
        if dashboard.handle(msg)? == Flow::Stop {
            break;
        }
    }
    dash_info!("Dashboard finished with {} jobs", dashboard.registry.len());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

/// Owns the registry and draws it to `out`.
pub(crate) struct Dashboard<W> {
    registry: JobRegistry,
    out: W,
    /// Jobs last drawn with a speed or ETA, keyed to the status line shown.
    live: BTreeMap<JobId, String>,
}

impl<W: Write> Dashboard<W> {
    pub(crate) fn new(registry: JobRegistry, out: W) -> Self {
        Self {
            registry,
            out,
            live: BTreeMap::new(),
        }
    }

    pub(crate) fn handle(&mut self, msg: Msg) -> Result<Flow> {
        match msg {
            Msg::Feed(Inbound::Event(event)) => self.registry.submit(event),
            Msg::Feed(Inbound::Snapshot(snapshot)) => {
                dash_info!("Restoring {} jobs from snapshot", snapshot.items.len());
                self.registry.restore(snapshot);
            }
            Msg::Tick => self.render_dirty()?,
            Msg::InputClosed => {
                self.render_summary()?;
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    /// Draws changed jobs, plus live jobs whose speed or ETA text aged since the last draw.
    fn render_dirty(&mut self) -> Result<()> {
        let mut views: Vec<JobView> = self
            .registry
            .consume_dirty()
            .iter()
            .filter_map(|id| self.registry.snapshot(id))
            .collect();
        let mut gone = Vec::new();
        for (id, shown) in &self.live {
            if views.iter().any(|view| &view.id == id) {
                continue;
            }
            match self.registry.snapshot(id) {
                Some(view) if &view.status_line != shown => views.push(view),
                Some(_) => {}
                None => gone.push(id.clone()),
            }
        }
        for id in gone {
            self.live.remove(&id);
        }
        if views.is_empty() {
            return Ok(());
        }
        dash_debug!("Redrawing {} jobs", views.len());

        let header = render::format_header(
            &timestamp(),
            self.registry.active_ids().len(),
            self.registry.done_ids().len(),
        );
        writeln!(self.out, "{header}")?;
        for view in views {
            for line in render::render_job(&view) {
                writeln!(self.out, "{line}")?;
            }
            if view.speed_text.is_some() || view.eta_seconds.is_some() {
                self.live.insert(view.id, view.status_line);
            } else {
                self.live.remove(&view.id);
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn render_summary(&mut self) -> Result<()> {
        self.registry.consume_dirty();
        for line in render::render_summary(&timestamp(), &self.registry.view()) {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
