use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;

use gridiron_analytics::AnalyticsEngine;
use gridiron_analytics::normalize::{NormalizeDefaults, normalize_rows};
use gridiron_analytics::play::{ChartUnit, Coded, GameMeta, GameStatus, PlayEvent};
use gridiron_analytics::stack::{UnitScope, compute_game_stack};

const UNITS: [&str; 3] = ["OFFENSE", "DEFENSE", "SPECIAL_TEAMS"];
const FAMILIES: [&str; 2] = ["RUN", "PASS"];

fn sample_rows(game: &str, plays: i64) -> Vec<Value> {
    (0..plays)
        .map(|i| {
            let unit = UNITS[(i % 7 % 3) as usize];
            let family = FAMILIES[(i % 2) as usize];
            json!({
                "id": format!("{game}-{i}"),
                "game_id": game,
                "unit": unit,
                "play_family": if unit == "SPECIAL_TEAMS" { Value::Null } else { json!(family) },
                "st_play_type": if unit == "SPECIAL_TEAMS" { json!("PUNT") } else { Value::Null },
                "run_concept": "Inside Zone",
                "wr_concept_id": "Stick",
                "down": 1 + i % 4,
                "distance": 1 + (i * 3) % 10,
                "ball_on": format!("O{}", 20 + i % 40),
                "gained_yards": (i * 7) % 23 - 3,
                "drive_number": i / 6,
                "quarter": 1 + (i * 4) / plays,
                "clock_seconds": 900 - (i * 13) % 900,
                "sequence": i,
                "result": if i % 29 == 0 { "Touchdown" } else { "" },
            })
        })
        .collect()
}

fn sample_events(game: &str, plays: i64) -> Vec<PlayEvent> {
    normalize_rows(&sample_rows(game, plays), &NormalizeDefaults::new("home", None))
}

fn final_meta(id: &str) -> GameMeta {
    let mut meta = GameMeta::new(id);
    meta.status = Some(Coded::Known(GameStatus::Final));
    meta
}

fn bench_normalize(c: &mut Criterion) {
    let rows = sample_rows("g1", 160);
    let defaults = NormalizeDefaults::new("home", None);
    c.bench_function("normalize_160_rows", |b| {
        b.iter(|| {
            let events = normalize_rows(black_box(&rows), &defaults);
            black_box(events.len());
        })
    });
}

fn bench_game_stack(c: &mut Criterion) {
    let meta = final_meta("g1");
    let events = sample_events("g1", 160);
    c.bench_function("game_stack_uncached", |b| {
        b.iter(|| {
            let stack = compute_game_stack(&meta, black_box(&events), UnitScope::All, String::new());
            black_box(stack.plays);
        })
    });

    let engine = AnalyticsEngine::default();
    engine.game_stack(&meta, &events, UnitScope::All);
    c.bench_function("game_stack_cached", |b| {
        b.iter(|| {
            let stack = engine.game_stack(&meta, black_box(&events), UnitScope::All);
            black_box(stack.plays);
        })
    });
}

fn bench_season(c: &mut Criterion) {
    let games: Vec<GameMeta> = (0..12).map(|i| final_meta(&format!("g{i}"))).collect();
    let events: Vec<PlayEvent> = games
        .iter()
        .flat_map(|g| sample_events(&g.id, 140))
        .collect();
    c.bench_function("season_cold", |b| {
        b.iter(|| {
            let engine = AnalyticsEngine::default();
            let report = engine.season("home", black_box(&games), black_box(&events));
            black_box(report.aggregate.games);
        })
    });
}

fn bench_tendency(c: &mut Criterion) {
    let mut events = sample_events("g1", 400);
    events.reverse();
    let engine = AnalyticsEngine::default();
    c.bench_function("tendency_offense", |b| {
        b.iter(|| {
            let report = engine.tendency(ChartUnit::Offense, black_box(&events), None);
            black_box(report.sample_size);
        })
    });
}

criterion_group!(perf, bench_normalize, bench_game_stack, bench_season, bench_tendency);
criterion_main!(perf);
