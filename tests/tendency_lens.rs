use std::fs;
use std::path::PathBuf;

use gridiron_analytics::AnalyticsEngine;
use gridiron_analytics::normalize::{NormalizeDefaults, normalize_rows, parse_rows_json};
use gridiron_analytics::play::{ChartUnit, FieldZone, PlayEvent};
use gridiron_analytics::tendency::{ANY_DOWN, Situation};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn newest_first() -> Vec<PlayEvent> {
    let rows = parse_rows_json(&read_fixture("tendency_rows.json")).expect("fixture should parse");
    let mut events = normalize_rows(&rows, &NormalizeDefaults::default());
    events.reverse();
    events
}

#[test]
fn short_yardage_lens_prefers_proven_concept() {
    let engine = AnalyticsEngine::default();
    let report = engine.tendency(ChartUnit::Offense, &newest_first(), None);

    assert_eq!(report.unit, "OFFENSE");
    assert_eq!(report.bucket, "short 3rd");
    assert_eq!(report.field_zone, FieldZone::RedZone);
    assert_eq!(report.sample_size, 6);
    assert_eq!(report.total_groups, 4);
    assert_eq!(report.groups.len(), 3);
    assert_eq!(report.groups[0].key, "RUN / Power");
    assert_eq!(report.groups[0].sample_size, 3);
    assert!((report.groups[0].success_rate - 1.0).abs() < 1e-9);
    assert_eq!(report.groups[1].key, "PASS / Stick");
    assert!(report.summary.contains("RUN / Power"));
}

#[test]
fn defense_lens_uses_only_defensive_snaps() {
    let engine = AnalyticsEngine::default();
    let report = engine.tendency(ChartUnit::Defense, &newest_first(), None);
    assert_eq!(report.sample_size, 1);
    assert_eq!(report.groups[0].key, "C3 / Sim");
    assert_eq!(report.field_zone, FieldZone::OpenField);
}

#[test]
fn unknown_situation_reads_every_snap() {
    let engine = AnalyticsEngine::default();
    let report = engine.tendency(
        ChartUnit::Offense,
        &newest_first(),
        Some(Situation {
            down: None,
            distance: None,
            field_zone: FieldZone::OpenField,
        }),
    );
    assert_eq!(report.bucket, ANY_DOWN);
    assert_eq!(report.sample_size, 6);
}
