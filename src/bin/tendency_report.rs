use std::fs;
use std::path::PathBuf;

use gridiron_analytics::EngineConfig;
use gridiron_analytics::engine::AnalyticsEngine;
use gridiron_analytics::normalize::{NormalizeDefaults, normalize_rows, parse_rows_json};
use gridiron_analytics::play::{ChartUnit, CodeLabel};

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/tendency_rows.json"));
    let unit = args
        .next()
        .and_then(|raw| ChartUnit::from_code(&raw.trim().to_ascii_uppercase().replace(' ', "_")))
        .unwrap_or(ChartUnit::Offense);

    let raw = fs::read_to_string(&path)?;
    let mut events = normalize_rows(&parse_rows_json(&raw)?, &NormalizeDefaults::default());
    // Rows on disk are oldest-first; the lens reads newest-first.
    events.reverse();

    let engine = AnalyticsEngine::new(EngineConfig::from_env());
    let report = engine.tendency(unit, &events, None);

    println!("Unit: {}", report.unit);
    println!("Situation: {} ({})", report.bucket, report.field_zone.label());
    println!("Sample: {} plays across {} groups", report.sample_size, report.total_groups);
    for group in &report.groups {
        println!(
            " - {:<28} {:>3} plays  success {:>5.1}%  explosive {:>5.1}%  avg {:>5.1} yds",
            group.key,
            group.sample_size,
            group.success_rate * 100.0,
            group.explosive_rate * 100.0,
            group.average_yards
        );
    }
    println!("{}", report.summary);

    Ok(())
}
