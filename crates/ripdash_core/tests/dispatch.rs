use std::sync::Arc;

use pretty_assertions::assert_eq;
use ripdash_core::{
    EngineConfig, Event, Inbound, JobId, JobRecord, JobRegistry, JobStatus, ManualClock,
    ProgressSample, Stage,
};

fn registry() -> (JobRegistry, ManualClock) {
    ripdash_logging::initialize_for_tests();
    let clock = ManualClock::new();
    let registry = JobRegistry::with_clock(EngineConfig::default(), Arc::new(clock.clone())).unwrap();
    (registry, clock)
}

fn id(text: &str) -> JobId {
    JobId::from(text)
}

fn status(job: &str, label: &str) -> Event {
    Event::Status {
        id: job.into(),
        label: label.to_string(),
    }
}

fn step(job: &str, label: &str, ok: bool, detail: Option<&str>, duration: Option<f64>) -> Event {
    Event::Step {
        id: job.into(),
        step: label.to_string(),
        ok,
        detail: detail.map(str::to_string),
        duration,
    }
}

fn downloaded(job: &str, downloaded: f64, total: f64) -> Event {
    Event::Progress {
        id: job.into(),
        sample: ProgressSample {
            total: Some(total),
            downloaded: Some(downloaded),
            ..ProgressSample::default()
        },
    }
}

fn done(job: &str, paths: &[&str]) -> Event {
    Event::Done {
        id: job.into(),
        paths: paths.iter().map(|p| p.to_string()).collect(),
        duration: None,
    }
}

fn percent(registry: &JobRegistry, job: &str) -> f64 {
    registry.snapshot(&id(job)).unwrap().overall_percent
}

#[test]
fn events_for_unknown_jobs_synthesize_a_record() {
    let (mut registry, _clock) = registry();
    registry.submit(status("x", "Resolving"));

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.active_ids(), vec![id("x")]);
    let job = registry.job(&id("x")).unwrap();
    assert_eq!(job.url(), "");
    assert_eq!(job.display_title(), "x");
    assert_eq!(job.status(), JobStatus::Running);
    assert_eq!(job.state().current_stage(), Some(Stage::Resolve));
}

#[test]
fn queued_jobs_wait_until_the_pipeline_reports() {
    let (mut registry, _clock) = registry();
    registry.submit(Event::Queued {
        item: JobRecord::new("a", "https://example.com/watch?v=1"),
    });

    let view = registry.snapshot(&id("a")).unwrap();
    assert_eq!(view.status, JobStatus::Queued);
    assert_eq!(view.title, "https://example.com/watch?v=1");
    assert_eq!(view.overall_percent, 0.0);
}

#[test]
fn late_queued_event_does_not_reset_progress() {
    let (mut registry, _clock) = registry();
    registry.submit(status("a", "Downloading"));
    registry.submit(downloaded("a", 50.0, 100.0));
    let before = percent(&registry, "a");

    registry.submit(Event::Queued {
        item: JobRecord::new("a", "https://example.com/a"),
    });
    assert_eq!(percent(&registry, "a"), before);
    assert_eq!(registry.job(&id("a")).unwrap().url(), "https://example.com/a");
    assert_eq!(registry.len(), 1);
}

#[test]
fn out_of_order_stages_never_move_backwards() {
    let (mut registry, _clock) = registry();
    registry.submit(status("a", "Downloading video data"));
    registry.submit(status("a", "Fetching metadata"));

    let state = registry.job(&id("a")).unwrap().state();
    assert_eq!(state.current_stage(), Some(Stage::Download));
    assert_eq!(state.completed_stage(), Some(Stage::Resolve));
}

#[test]
fn unclassified_labels_only_update_the_raw_label() {
    let (mut registry, _clock) = registry();
    registry.submit(status("a", "Resolving"));
    registry.submit(status("a", "Starting"));

    let view = registry.snapshot(&id("a")).unwrap();
    assert_eq!(view.current_stage, Some(Stage::Resolve));
    assert_eq!(view.stage_label.as_deref(), Some("Starting"));
}

#[test]
fn meta_fills_descriptive_fields() {
    let (mut registry, _clock) = registry();
    registry.submit(Event::Meta {
        id: "a".into(),
        title: Some("Artist - Song".to_string()),
        provider: Some("soundcloud".to_string()),
        kind: Some("audio".to_string()),
    });
    registry.submit(Event::Meta {
        id: "a".into(),
        title: Some("  ".to_string()),
        provider: None,
        kind: None,
    });

    let view = registry.snapshot(&id("a")).unwrap();
    assert_eq!(view.title, "Artist - Song");
    assert_eq!(view.provider.as_deref(), Some("soundcloud"));
    assert_eq!(view.kind.as_deref(), Some("audio"));
    assert_eq!(view.status, JobStatus::Running);
    assert_eq!(view.current_stage, None);
}

#[test]
fn replayed_steps_are_idempotent() {
    let (mut registry, _clock) = registry();
    registry.submit(status("a", "Downloading"));
    registry.submit(step("a", "Metadata", true, None, Some(2.0)));
    let state = registry.job(&id("a")).unwrap().state().clone();

    registry.submit(step("a", "Metadata", true, None, Some(2.0)));
    let job = registry.job(&id("a")).unwrap();
    assert_eq!(job.state(), &state);
    assert_eq!(job.steps().len(), 1);
}

#[test]
fn failed_step_marks_the_job_without_ending_it() {
    let (mut registry, _clock) = registry();
    registry.submit(status("a", "Embedding artwork"));
    registry.submit(step("a", "Embed artwork", false, Some("no cover found"), None));

    let view = registry.snapshot(&id("a")).unwrap();
    assert!(view.errored);
    assert_eq!(view.status, JobStatus::Running);
    assert_eq!(view.error_line.as_deref(), Some("no cover found"));
    assert_eq!(registry.active_ids(), vec![id("a")]);

    registry.submit(status("a", "Tagging"));
    assert_eq!(
        registry.snapshot(&id("a")).unwrap().current_stage,
        Some(Stage::Tagging)
    );
}

#[test]
fn failed_step_without_detail_names_the_step() {
    let (mut registry, _clock) = registry();
    registry.submit(step("a", "Tagging", false, None, None));
    assert_eq!(
        registry.snapshot(&id("a")).unwrap().error_line.as_deref(),
        Some("Tagging failed")
    );
}

#[test]
fn done_moves_the_job_exactly_once() {
    let (mut registry, _clock) = registry();
    registry.submit(status("a", "Downloading"));
    registry.submit(status("b", "Downloading"));
    registry.submit(done("a", &["/music/a.mp3"]));
    registry.consume_dirty();

    registry.submit(done("a", &["/music/other.mp3"]));
    assert_eq!(registry.consume_dirty(), Vec::<JobId>::new());
    assert_eq!(registry.active_ids(), vec![id("b")]);
    assert_eq!(registry.done_ids(), vec![id("a")]);

    let view = registry.snapshot(&id("a")).unwrap();
    assert_eq!(view.status, JobStatus::Done);
    assert_eq!(view.output_paths, vec!["/music/a.mp3".to_string()]);
    assert_eq!(view.overall_percent, 100.0);
}

#[test]
fn error_is_terminal_and_freezes_progress() {
    let (mut registry, _clock) = registry();
    registry.submit(status("a", "Downloading"));
    registry.submit(downloaded("a", 50.0, 100.0));
    let before = percent(&registry, "a");

    registry.submit(Event::Error {
        id: "a".into(),
        message: "HTTP Error 403".to_string(),
        stage: Some("Downloading".to_string()),
    });
    registry.submit(done("a", &["/tmp/ignored"]));
    registry.submit(downloaded("a", 90.0, 100.0));

    let view = registry.snapshot(&id("a")).unwrap();
    assert_eq!(view.status, JobStatus::Error);
    assert_eq!(view.error_line.as_deref(), Some("Downloading: HTTP Error 403"));
    assert!(view.output_paths.is_empty());
    assert_eq!(view.overall_percent, before);
    assert_eq!(registry.done_ids(), vec![id("a")]);
}

#[test]
fn unusable_byte_counts_keep_the_previous_fraction() {
    let (mut registry, _clock) = registry();
    registry.submit(status("a", "Downloading"));
    registry.submit(downloaded("a", 25.0, 100.0));
    let before = registry.job(&id("a")).unwrap().state().download_fraction();

    registry.submit(downloaded("a", 50.0, 0.0));
    registry.submit(Event::Progress {
        id: "a".into(),
        sample: ProgressSample::default(),
    });
    assert_eq!(
        registry.job(&id("a")).unwrap().state().download_fraction(),
        before
    );

    registry.submit(downloaded("a", 150.0, 100.0));
    assert_eq!(registry.job(&id("a")).unwrap().state().download_fraction(), 1.0);
}

#[test]
fn estimated_total_is_used_without_an_exact_one() {
    let (mut registry, _clock) = registry();
    registry.submit(status("a", "Downloading"));
    registry.submit(Event::Progress {
        id: "a".into(),
        sample: ProgressSample {
            total_estimate: Some(400.0),
            downloaded: Some(100.0),
            ..ProgressSample::default()
        },
    });
    assert_eq!(registry.job(&id("a")).unwrap().state().download_fraction(), 0.25);
}

#[test]
fn dirty_jobs_are_reported_once_in_arrival_order() {
    let (mut registry, _clock) = registry();
    registry.submit(status("b", "Resolving"));
    registry.submit(status("a", "Resolving"));
    registry.submit(status("b", "Downloading"));

    assert_eq!(registry.consume_dirty(), vec![id("b"), id("a")]);
    assert!(registry.consume_dirty().is_empty());
}

#[test]
fn views_list_active_jobs_before_finished_ones() {
    let (mut registry, _clock) = registry();
    registry.submit(status("a", "Downloading"));
    registry.submit(status("b", "Downloading"));
    registry.submit(done("a", &[]));
    registry.submit(status("c", "Resolving"));

    let ids: Vec<JobId> = registry.snapshot_all().into_iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![id("b"), id("c"), id("a")]);

    let dashboard = registry.view();
    assert_eq!(dashboard.job_count(), 3);
    assert_eq!(dashboard.done.len(), 1);
    assert_eq!(registry.snapshot(&id("missing")), None);
}

#[test]
fn restore_rebuilds_jobs_from_a_state_snapshot() {
    let (mut registry, _clock) = registry();
    let line = r#"{"items": [
        {"id": "r1", "url": "https://example.com/1", "status": "running", "title": "Song",
         "current": "Downloading video data",
         "progress": {"downloaded_bytes": 50, "total_bytes": 100},
         "steps": {"Resolve": {"ok": true, "duration": 1.0},
                   "Metadata": {"ok": true, "duration": 2.0}}},
        {"id": 2, "url": "https://example.com/2", "status": "done", "paths": ["/music/2.mp3"]}
    ]}"#;
    let Inbound::Snapshot(snapshot) = Inbound::from_json(line).unwrap() else {
        panic!("expected a snapshot");
    };

    registry.restore(snapshot.clone());
    let first = registry.snapshot_all();
    assert_eq!(registry.active_ids(), vec![id("r1")]);
    assert_eq!(registry.done_ids(), vec![id("2")]);

    let r1 = &first[0];
    assert_eq!(r1.title, "Song");
    assert_eq!(r1.current_stage, Some(Stage::Download));
    assert!((r1.overall_percent - 3.1 / 7.9 * 100.0).abs() < 1e-9);
    assert_eq!(
        r1.step_lines,
        vec!["OK Metadata · 00:02".to_string(), "OK Resolve · 00:01".to_string()]
    );

    let r2 = &first[1];
    assert_eq!(r2.status, JobStatus::Done);
    assert_eq!(r2.overall_percent, 100.0);
    assert_eq!(r2.output_paths, vec!["/music/2.mp3".to_string()]);

    registry.restore(snapshot);
    assert_eq!(registry.snapshot_all(), first);
    assert_eq!(registry.len(), 2);
}

#[test]
fn invalid_configuration_is_rejected_up_front() {
    let config = EngineConfig {
        min_tick_gap: 30.0,
        ..EngineConfig::default()
    };
    assert!(JobRegistry::new(config).is_err());
}

#[test]
fn oversized_time_windows_are_rejected_at_construction() {
    let config = EngineConfig {
        eta_expiry_secs: 1e20,
        ..EngineConfig::default()
    };
    let result = JobRegistry::with_clock(config, Arc::new(ManualClock::new()));
    assert!(matches!(
        result,
        Err(ripdash_core::ConfigError::InvalidWindow {
            name: "eta_expiry_secs",
            ..
        })
    ));
}
