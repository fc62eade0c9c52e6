use std::fs;
use std::path::PathBuf;

use serde_json::json;

use gridiron_analytics::normalize::{
    NormalizeDefaults, normalize_rows, parse_games_json, parse_rows_json,
};
use gridiron_analytics::play::{Coded, GameMeta, GameStatus, PlayEvent};
use gridiron_analytics::season::{SeasonOutlook, WIN_RATE_CEIL, WIN_RATE_FLOOR};
use gridiron_analytics::{AnalyticsEngine, EngineConfig};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn season_fixture() -> (Vec<GameMeta>, Vec<PlayEvent>) {
    let games = parse_games_json(&read_fixture("season_games.json")).expect("games should parse");
    let rows = parse_rows_json(&read_fixture("season_plays.json")).expect("plays should parse");
    (games, normalize_rows(&rows, &NormalizeDefaults::new("home", None)))
}

fn final_meta(id: &str) -> GameMeta {
    let mut meta = GameMeta::new(id);
    meta.status = Some(Coded::Known(GameStatus::Final));
    meta
}

/// One game where the offense succeeds every snap and the defense stops every snap.
fn lopsided_game(team_dominates: bool) -> Vec<PlayEvent> {
    let (good, bad) = if team_dominates {
        ("OFFENSE", "DEFENSE")
    } else {
        ("DEFENSE", "OFFENSE")
    };
    let mut rows = Vec::new();
    for i in 0..10 {
        rows.push(json!({"id": format!("a{i}"), "game_id": "g1", "unit": good, "play_family": "PASS",
                         "down": 1, "distance": 10, "gained_yards": 20, "sequence": i * 2,
                         "quarter": 1 + i / 3, "clock_seconds": 800 - (i % 3) * 200}));
        rows.push(json!({"id": format!("b{i}"), "game_id": "g1", "unit": bad, "play_family": "RUN",
                         "down": 1, "distance": 10, "gained_yards": -2, "turnover": true,
                         "sequence": i * 2 + 1, "quarter": 1 + i / 3,
                         "clock_seconds": 790 - (i % 3) * 200}));
    }
    normalize_rows(&rows, &NormalizeDefaults::new("home", None))
}

#[test]
fn season_fixture_aggregates_played_games_in_kickoff_order() {
    let (games, events) = season_fixture();
    let engine = AnalyticsEngine::default();
    let report = engine.season("home", &games, &events);

    assert_eq!(report.scheduled_games, 3);
    assert_eq!(report.remaining_games, 1);

    let agg = &report.aggregate;
    assert_eq!(agg.games, 2);
    assert_eq!(agg.record.wins, 1);
    assert_eq!(agg.record.losses, 1);
    assert_eq!(agg.plays, 13);
    assert!((agg.points_for_per_game - 3.5).abs() < 1e-9);
    assert!((agg.points_against_per_game - 3.5).abs() < 1e-9);
    assert!(agg.scoring_differential_per_game.abs() < 1e-9);
    assert_eq!(agg.special_teams.plays, 1);

    let ids: Vec<&str> = agg.trends.game_control.iter().map(|p| p.game_id.as_str()).collect();
    assert_eq!(ids, vec!["g1", "g2"]);
    assert_eq!(agg.trends.success_rate[0].label, "State");
}

#[test]
fn season_fixture_projects_with_remaining_schedule() {
    let (games, events) = season_fixture();
    let engine = AnalyticsEngine::default();
    let report = engine.season("home", &games, &events);

    let SeasonOutlook::Projected(projection) = &report.outlook else {
        panic!("two played games should project");
    };
    assert_eq!(projection.games_modeled, 2);
    assert!((WIN_RATE_FLOOR..=WIN_RATE_CEIL).contains(&projection.projected_win_rate));
    assert!((WIN_RATE_FLOOR..=WIN_RATE_CEIL).contains(&projection.projected_conference_win_rate));
    assert!((0.0..=1.0).contains(&projection.strength_of_schedule));
    assert!((0.0..=1.0).contains(&projection.playoff_probability));

    let sim = &projection.simulation;
    assert_eq!(sim.scheduled_games, 3);
    assert_eq!(sim.remaining_games, 1);
    assert_eq!(sim.win_distribution.len(), 4);
    assert_eq!(sim.win_distribution[0], 0.0);
    assert!(sim.expected_wins >= 1.0 && sim.expected_wins <= 2.0);
    assert_eq!(projection.playoff_probability, sim.playoff_probability);
}

#[test]
fn projection_clamps_to_ceiling_for_dominant_game() {
    let engine = AnalyticsEngine::default();
    let report = engine.season("home", &[final_meta("g1")], &lopsided_game(true));
    let projection = report.outlook.projection().expect("one game should project");
    assert_eq!(projection.projected_win_rate, WIN_RATE_CEIL);
    assert!(projection.game_control_index > 0.0);
}

#[test]
fn projection_clamps_to_floor_for_dominated_game() {
    let engine = AnalyticsEngine::default();
    let report = engine.season("home", &[final_meta("g1")], &lopsided_game(false));
    let projection = report.outlook.projection().expect("one game should project");
    assert_eq!(projection.projected_win_rate, WIN_RATE_FLOOR);
}

#[test]
fn schedule_without_snaps_is_insufficient_data() {
    let (games, _) = season_fixture();
    let engine = AnalyticsEngine::default();
    let report = engine.season("home", &games, &[]);
    assert_eq!(report.outlook, SeasonOutlook::InsufficientData { games_modeled: 0 });
    assert_eq!(report.aggregate.games, 0);
    assert_eq!(report.remaining_games, 1);
}

#[test]
fn seeded_simulation_is_reproducible_across_engines() {
    let (games, events) = season_fixture();
    let config = EngineConfig::from_lookup(|k| (k == "ENGINE_SIM_SEED").then(|| "1234".to_string()));
    let a = AnalyticsEngine::new(config.clone()).season("home", &games, &events);
    let b = AnalyticsEngine::new(config).season("home", &games, &events);
    assert_eq!(a.outlook, b.outlook);
    let sim = &a.outlook.projection().expect("projected").simulation;
    assert_eq!(sim.seed, 1234);
    assert_eq!(sim.iterations, 2_000);
}
