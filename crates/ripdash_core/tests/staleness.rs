use std::sync::Arc;

use ripdash_core::{EngineConfig, Event, JobId, JobRegistry, ManualClock, ProgressSample, SpeedUnit};

fn registry_with(config: EngineConfig) -> (JobRegistry, ManualClock) {
    ripdash_logging::initialize_for_tests();
    let clock = ManualClock::new();
    let registry = JobRegistry::with_clock(config, Arc::new(clock.clone())).unwrap();
    (registry, clock)
}

fn speed(text: Option<&str>, bps: Option<f64>) -> Event {
    Event::Progress {
        id: "a".into(),
        sample: ProgressSample {
            speed_text: text.map(str::to_string),
            speed: bps,
            ..ProgressSample::default()
        },
    }
}

fn speed_of(registry: &JobRegistry) -> Option<String> {
    registry.snapshot(&JobId::from("a")).unwrap().speed_text
}

#[test]
fn speed_is_blanked_after_eight_quiet_seconds() {
    let (mut registry, clock) = registry_with(EngineConfig::default());
    registry.submit(speed(Some("5.0 MB/s"), None));

    clock.advance_secs(8.0);
    assert_eq!(speed_of(&registry).as_deref(), Some("5.0 MB/s"));

    clock.advance_secs(0.1);
    assert_eq!(speed_of(&registry), None);
    let view = registry.snapshot(&JobId::from("a")).unwrap();
    assert!(!view.status_line.contains("MB/s"), "{}", view.status_line);
}

#[test]
fn new_readings_restart_the_staleness_window() {
    let (mut registry, clock) = registry_with(EngineConfig::default());
    registry.submit(speed(Some("1.0 MB/s"), None));
    clock.advance_secs(6.0);
    registry.submit(speed(Some("2.0 MB/s"), None));
    clock.advance_secs(6.0);
    assert_eq!(speed_of(&registry).as_deref(), Some("2.0 MB/s"));
}

#[test]
fn samples_without_speed_do_not_refresh_it() {
    let (mut registry, clock) = registry_with(EngineConfig::default());
    registry.submit(speed(Some("1.0 MB/s"), None));
    clock.advance_secs(6.0);
    registry.submit(speed(None, None));
    clock.advance_secs(3.0);
    assert_eq!(speed_of(&registry), None);
}

#[test]
fn numeric_speed_is_formatted_in_the_configured_unit() {
    let (mut registry, _clock) = registry_with(EngineConfig::default());
    registry.submit(speed(None, Some(2_500_000.0)));
    assert_eq!(speed_of(&registry).as_deref(), Some("2.5 MB/s"));

    let config = EngineConfig {
        speed_unit: SpeedUnit::Mbps,
        ..EngineConfig::default()
    };
    let (mut registry, _clock) = registry_with(config);
    registry.submit(speed(Some("   "), Some(2_500_000.0)));
    assert_eq!(speed_of(&registry).as_deref(), Some("20.0 Mb/s"));
}

#[test]
fn custom_staleness_window() {
    let config = EngineConfig {
        speed_stale_secs: 2.0,
        ..EngineConfig::default()
    };
    let (mut registry, clock) = registry_with(config);
    registry.submit(speed(Some("3.0 MB/s"), None));
    clock.advance_secs(2.5);
    assert_eq!(speed_of(&registry), None);
}
