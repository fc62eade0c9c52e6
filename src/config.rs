use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::play::AnalyticsPreferences;

pub const DEFAULT_STACK_CACHE_CAPACITY: usize = 200;
pub const DEFAULT_SEASON_CACHE_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub iterations: u32,
    pub seed: u64,
    /// Season win fraction that earns a playoff berth.
    pub playoff_win_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: 2_000,
            seed: 0x5EED_F00D,
            playoff_win_rate: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub stack_cache_capacity: usize,
    pub season_cache_capacity: usize,
    pub tendency_top_n: usize,
    pub preferences: AnalyticsPreferences,
    pub simulation: SimulationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stack_cache_capacity: DEFAULT_STACK_CACHE_CAPACITY,
            season_cache_capacity: DEFAULT_SEASON_CACHE_CAPACITY,
            tendency_top_n: 3,
            preferences: AnalyticsPreferences::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Overlay `ENGINE_*` settings from `lookup` on the defaults; unparsable values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
            raw.and_then(|v| v.trim().parse::<T>().ok())
        }

        let mut cfg = Self::default();
        if let Some(v) = parsed::<usize>(lookup("ENGINE_STACK_CACHE_CAPACITY")) {
            cfg.stack_cache_capacity = v.max(1);
        }
        if let Some(v) = parsed::<usize>(lookup("ENGINE_SEASON_CACHE_CAPACITY")) {
            cfg.season_cache_capacity = v.max(1);
        }
        if let Some(v) = parsed::<usize>(lookup("ENGINE_TENDENCY_TOP_N")) {
            cfg.tendency_top_n = v.max(1);
        }
        if let Some(v) = parsed::<i32>(lookup("ENGINE_EXPLOSIVE_RUN")) {
            cfg.preferences.explosive_run = v;
        }
        if let Some(v) = parsed::<i32>(lookup("ENGINE_EXPLOSIVE_PASS")) {
            cfg.preferences.explosive_pass = v;
        }
        if let Some(v) = lookup("ENGINE_INCLUDE_TURNOVER_ON_DOWNS").and_then(|v| parse_flag(&v)) {
            cfg.preferences.include_turnover_on_downs = v;
        }
        if let Some(v) = parsed::<u32>(lookup("ENGINE_SIM_ITERATIONS")) {
            cfg.simulation.iterations = v;
        }
        if let Some(v) = parsed::<u64>(lookup("ENGINE_SIM_SEED")) {
            cfg.simulation.seed = v;
        }
        if let Some(v) = parsed::<f64>(lookup("ENGINE_PLAYOFF_WIN_RATE")) {
            cfg.simulation.playoff_win_rate = v.clamp(0.0, 1.0);
        }
        cfg
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(Self::default());
        }
        serde_json::from_str(trimmed).context("invalid engine config json")
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read engine config {}", path.display()))?;
        Self::from_json_str(&raw)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_cache_bounds() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.stack_cache_capacity, 200);
        assert_eq!(cfg.season_cache_capacity, 50);
        assert_eq!(cfg.preferences.explosive_run, 12);
        assert_eq!(cfg.preferences.explosive_pass, 15);
    }

    #[test]
    fn lookup_overrides_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ENGINE_STACK_CACHE_CAPACITY", "10"),
            ("ENGINE_SEASON_CACHE_CAPACITY", "lots"),
            ("ENGINE_INCLUDE_TURNOVER_ON_DOWNS", "off"),
            ("ENGINE_SIM_SEED", "42"),
            ("ENGINE_PLAYOFF_WIN_RATE", "3.5"),
        ]);
        let cfg = EngineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.stack_cache_capacity, 10);
        assert_eq!(cfg.season_cache_capacity, 50);
        assert!(!cfg.preferences.include_turnover_on_downs);
        assert_eq!(cfg.simulation.seed, 42);
        assert_eq!(cfg.simulation.playoff_win_rate, 1.0);
    }

    #[test]
    fn json_config_fills_missing_fields() {
        let cfg = EngineConfig::from_json_str(
            r#"{"tendency_top_n": 5, "preferences": {"explosiveRun": 10}}"#,
        )
        .unwrap();
        assert_eq!(cfg.tendency_top_n, 5);
        assert_eq!(cfg.preferences.explosive_run, 10);
        assert_eq!(cfg.preferences.explosive_pass, 15);
        assert_eq!(cfg.stack_cache_capacity, 200);
        assert!(EngineConfig::from_json_str("[1]").is_err());
    }
}
