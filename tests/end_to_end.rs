use std::fs;
use std::path::PathBuf;

use gridiron_analytics::normalize::{NormalizeDefaults, normalize_rows, parse_games_json, parse_rows_json};
use gridiron_analytics::play::{Coded, GameMeta, GameStatus, PlayEvent};
use gridiron_analytics::stack::{UnitScope, compute_game_stack};
use gridiron_analytics::{AnalyticsEngine, EngineConfig};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn three_plays() -> Vec<PlayEvent> {
    let rows = parse_rows_json(&read_fixture("three_play_drive.json")).expect("fixture should parse");
    normalize_rows(&rows, &NormalizeDefaults::new("home", Some("State")))
}

fn final_meta(id: &str) -> GameMeta {
    let mut meta = GameMeta::new(id);
    meta.status = Some(Coded::Known(GameStatus::Final));
    meta
}

#[test]
fn three_play_drive_box_score() {
    let engine = AnalyticsEngine::default();
    let stack = engine.game_stack(&final_meta("g1"), &three_plays(), UnitScope::All);
    let box_score = &stack.stack.box_score;

    assert_eq!(box_score.base.plays, 3);
    assert_eq!(box_score.base.total_yards, 33);
    assert_eq!(box_score.base.explosives, 1);
    assert!((box_score.yards_per_play - 11.0).abs() < 1e-9);
    assert!((box_score.success_rate - 1.0).abs() < 1e-9);
    assert_eq!(box_score.late_down.attempts, 0);
    assert_eq!(box_score.base.drives, 1);
    assert_eq!(stack.stack.drives.len(), 1);
    assert_eq!(stack.stack.drives[0].plays(), 3);
    assert_eq!(stack.stack.drives[0].yards, 33);
}

#[test]
fn three_play_drive_feeds_advanced_outputs() {
    let engine = AnalyticsEngine::default();
    let stack = engine.game_stack(&final_meta("g1"), &three_plays(), UnitScope::All);
    let advanced = &stack.stack.advanced;

    assert_eq!(advanced.epa_ledger.len(), 3);
    assert_eq!(advanced.win_probability.len(), 3);
    assert!(
        advanced
            .win_probability
            .iter()
            .all(|p| (0.0..=1.0).contains(&p.win_probability))
    );
    assert!(!stack.stack.core.has_opponent);
    assert_eq!(stack.stack.summary.points_for, 0);
    assert_eq!(stack.last_event_at.map(|t| t.to_rfc3339()).as_deref(), Some("2024-09-07T18:04:00+00:00"));
}

#[test]
fn stack_serializes_with_flattened_counts() {
    let engine = AnalyticsEngine::default();
    let stack = engine.game_stack(&final_meta("g1"), &three_plays(), UnitScope::Offense);
    let json = serde_json::to_value(stack.as_ref()).expect("stack should serialize");
    assert_eq!(json["unit"], "OFFENSE");
    assert_eq!(json["stack"]["box_score"]["plays"], 3);
    assert_eq!(json["stack"]["box_score"]["total_yards"], 33);
    assert_eq!(json["stack"]["box_score"]["late_down"]["attempts"], 0);
}

#[test]
fn preferences_change_explosive_count() {
    let mut config = EngineConfig::default();
    config.preferences.explosive_pass = 25;
    let engine = AnalyticsEngine::new(config);
    let stack = engine.game_stack(&final_meta("g1"), &three_plays(), UnitScope::All);
    assert_eq!(stack.stack.box_score.base.explosives, 0);
}

#[test]
fn rows_for_other_games_are_ignored() {
    let engine = AnalyticsEngine::default();
    let stack = engine.game_stack(&final_meta("g9"), &three_plays(), UnitScope::All);
    assert_eq!(stack.plays, 0);
    assert_eq!(stack.stack.box_score.base.plays, 0);
    assert_eq!(stack.stack.box_score.success_rate, 0.0);
    assert!(stack.stack.drives.is_empty());
}

#[test]
fn uncached_stacks_are_identical_across_runs() {
    let games = parse_games_json(&read_fixture("season_games.json")).expect("games should parse");
    let rows = parse_rows_json(&read_fixture("season_plays.json")).expect("plays should parse");
    let events = normalize_rows(&rows, &NormalizeDefaults::new("home", None));

    let mut compared = 0;
    for meta in &games {
        let own: Vec<PlayEvent> = events.iter().filter(|e| e.game_id == meta.id).cloned().collect();
        if own.is_empty() {
            continue;
        }
        for scope in [UnitScope::All, UnitScope::Offense, UnitScope::Defense] {
            let first = compute_game_stack(meta, &own, scope, String::new());
            let second = compute_game_stack(meta, &own, scope, String::new());
            assert_eq!(first, second, "{} {:?}", meta.id, scope);
            assert_eq!(
                serde_json::to_string(&first).expect("stack should serialize"),
                serde_json::to_string(&second).expect("stack should serialize"),
            );
            assert_eq!(first.stack.advanced.win_probability, second.stack.advanced.win_probability);
            assert_eq!(first.stack.advanced.attribution, second.stack.advanced.attribution);
        }
        let full = compute_game_stack(meta, &own, UnitScope::All, String::new());
        assert!(!full.stack.advanced.win_probability.is_empty());
        compared += 1;
    }
    assert!(compared >= 2);

    let a = AnalyticsEngine::default().season("home", &games, &events);
    let b = AnalyticsEngine::default().season("home", &games, &events);
    assert_eq!(a.as_ref(), b.as_ref());
}
