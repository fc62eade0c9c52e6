use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gridiron_analytics::normalize::{
    NormalizeDefaults, normalize_rows, parse_games_json, parse_rows_json,
};
use gridiron_analytics::play::{GameMeta, PlayEvent};
use gridiron_analytics::stack::UnitScope;
use gridiron_analytics::{AnalyticsEngine, EngineConfig};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some(plays_path) = arg_value(&args, "--plays").map(PathBuf::from) else {
        eprintln!(
            "usage: gridiron_analytics --plays <rows.json> [--games <games.json>] [--team <id>] \
             [--opponent <name>] [--unit ALL|OFFENSE|DEFENSE|SPECIAL_TEAMS] [--config <engine.json>]"
        );
        return Err(anyhow!("missing --plays"));
    };

    let config = match arg_value(&args, "--config") {
        Some(path) => EngineConfig::from_json_file(Path::new(&path))?,
        None => EngineConfig::from_env(),
    };
    let scope = match arg_value(&args, "--unit") {
        Some(raw) => UnitScope::parse(&raw).with_context(|| format!("unknown unit {raw}"))?,
        None => UnitScope::All,
    };
    let team_id = arg_value(&args, "--team").unwrap_or_else(|| "team".to_string());
    let defaults = NormalizeDefaults::new(&team_id, arg_value(&args, "--opponent").as_deref());

    let raw = fs::read_to_string(&plays_path)
        .with_context(|| format!("read plays {}", plays_path.display()))?;
    let events = normalize_rows(&parse_rows_json(&raw)?, &defaults);

    let games = match arg_value(&args, "--games") {
        Some(path) => {
            let raw = fs::read_to_string(&path).with_context(|| format!("read games {path}"))?;
            parse_games_json(&raw)?
        }
        None => games_from_events(&events),
    };
    info!(plays = events.len(), games = games.len(), unit = scope.label(), "loaded");

    let engine = AnalyticsEngine::new(config);
    let stacks = engine.game_stacks(&games, &events, scope);
    let season = engine.season(&team_id, &games, &events);

    let out = serde_json::json!({
        "stacks": stacks.iter().map(|s| s.as_ref()).collect::<Vec<_>>(),
        "season": season.as_ref(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(v) = arg.strip_prefix(&prefix) {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

/// Without a schedule, every game id seen in the rows becomes a game of unknown status.
fn games_from_events(events: &[PlayEvent]) -> Vec<GameMeta> {
    let ids: BTreeSet<&str> = events.iter().map(|e| e.game_id.as_str()).collect();
    ids.into_iter()
        .map(|id| {
            let mut meta = GameMeta::new(id);
            meta.opponent_name = events
                .iter()
                .find(|e| e.game_id == id)
                .and_then(|e| e.opponent_name.clone());
            meta
        })
        .collect()
}
