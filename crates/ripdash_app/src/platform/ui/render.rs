//! Plain-text rendering of job views.

use ripdash_core::{DashboardView, JobStatus, JobView};

pub(crate) const BAR_WIDTH: usize = 24;

/// Lines for one job: its row, then error and output lines when present.
pub(crate) fn render_job(job: &JobView) -> Vec<String> {
    let mut lines = vec![format_job_row(job)];
    if let Some(error) = &job.error_line {
        lines.push(format!("    ! {error}"));
    }
    for path in &job.output_paths {
        lines.push(format!("    -> {path}"));
    }
    lines
}

/// `-- 12:00:01 · 2 active, 1 done --`
pub(crate) fn format_header(stamp: &str, active: usize, done: usize) -> String {
    format!("-- {stamp} · {active} active, {done} done --")
}

/// Everything, active jobs first.
pub(crate) fn render_summary(stamp: &str, view: &DashboardView) -> Vec<String> {
    let mut lines = vec![format!(
        "== {stamp} · feed closed · {} active, {} done ==",
        view.active.len(),
        view.done.len()
    )];
    for job in view.active.iter().chain(view.done.iter()) {
        lines.extend(render_job(job));
    }
    lines
}

fn format_job_row(job: &JobView) -> String {
    format!(
        "[{id}] {badge}{bar} {status} — {title}",
        id = job.id,
        badge = status_badge(job.status),
        bar = progress_bar(job, BAR_WIDTH),
        status = job.status_line,
        title = job.title
    )
}

fn status_badge(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "(queued) ",
        JobStatus::Running => "",
        JobStatus::Done => "OK ",
        JobStatus::Error => "ERR ",
    }
}

/// `[####|...>....|...]`: filled up to the overall percent, with markers for
/// stages not reached yet (`>` for the next one).
fn progress_bar(job: &JobView, width: usize) -> String {
    if width == 0 {
        return "[]".to_string();
    }
    let fraction = (job.overall_percent / 100.0).clamp(0.0, 1.0);
    let filled = ((fraction * width as f64).round() as usize).min(width);

    let mut cells = vec!['.'; width];
    cells[..filled].fill('#');
    for tick in job.ticks.iter().filter(|tick| !tick.reached) {
        let cell = ((tick.position / 100.0) * (width - 1) as f64).round() as usize;
        let cell = cell.min(width - 1);
        if cell >= filled {
            cells[cell] = if tick.is_next { '>' } else { '|' };
        }
    }
    format!("[{}]", cells.into_iter().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ripdash_core::{JobId, Stage, StageTickView};

    fn job(status: JobStatus, percent: f64) -> JobView {
        let positions = [0.0, 10.0, 20.0, 60.0, 80.0, 100.0];
        let current = Stage::ALL
            .iter()
            .zip(positions)
            .filter(|(_, position)| *position <= percent)
            .map(|(stage, _)| *stage)
            .last();
        JobView {
            id: JobId::from("7"),
            url: "https://example.com/v".to_string(),
            title: "Artist - Song".to_string(),
            provider: None,
            kind: None,
            status,
            stage_label: None,
            current_stage: current,
            overall_percent: percent,
            ticks: Stage::ALL
                .iter()
                .zip(positions)
                .map(|(stage, position)| StageTickView {
                    stage: *stage,
                    position,
                    reached: percent >= position - 0.5,
                    is_current: Some(*stage) == current,
                    is_next: current.and_then(Stage::next) == Some(*stage),
                })
                .collect(),
            speed_text: None,
            eta_seconds: None,
            status_line: format!("{percent:.1}%"),
            error_line: None,
            errored: false,
            output_paths: Vec::new(),
            step_lines: Vec::new(),
        }
    }

    #[test]
    fn bar_fills_and_marks_upcoming_stages() {
        let view = job(JobStatus::Running, 50.0);
        // 12 of 24 cells filled; Remux (next) at 60%, Tagging at 80%, Saved at 100%.
        assert_eq!(progress_bar(&view, BAR_WIDTH), "[############..>...|....|]");
    }

    #[test]
    fn finished_job_has_a_full_bar() {
        let view = job(JobStatus::Done, 100.0);
        assert_eq!(progress_bar(&view, 10), "[##########]");
    }

    #[test]
    fn row_shows_id_bar_status_and_title() {
        let view = job(JobStatus::Running, 50.0);
        assert_eq!(
            format_job_row(&view),
            "[7] [############..>...|....|] 50.0% — Artist - Song"
        );
    }

    #[test]
    fn error_and_paths_follow_the_row() {
        let mut view = job(JobStatus::Error, 20.0);
        view.error_line = Some("Download: HTTP Error 403".to_string());
        view.output_paths = vec!["/music/partial.part".to_string()];

        let lines = render_job(&view);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("[7] ERR ["));
        assert_eq!(lines[1], "    ! Download: HTTP Error 403");
        assert_eq!(lines[2], "    -> /music/partial.part");
    }

    #[test]
    fn summary_lists_active_before_done() {
        let mut done = job(JobStatus::Done, 100.0);
        done.id = JobId::from("1");
        let view = DashboardView {
            active: vec![job(JobStatus::Queued, 0.0)],
            done: vec![done],
        };

        let lines = render_summary("12:00:00", &view);
        assert_eq!(lines[0], "== 12:00:00 · feed closed · 1 active, 1 done ==");
        assert!(lines[1].starts_with("[7] (queued) ["));
        assert!(lines[2].starts_with("[1] OK ["));
        assert_eq!(format_header("12:00:00", 1, 1), "-- 12:00:00 · 1 active, 1 done --");
    }
}
