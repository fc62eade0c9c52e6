use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{SignatureCache, season_signature, stack_signature};
use crate::config::EngineConfig;
use crate::normalize::apply_preferences;
use crate::play::{ChartUnit, GameMeta, PlayEvent};
use crate::season::{SeasonAggregate, SeasonOutlook, aggregate_season, project_season};
use crate::stack::{GameStack, UnitScope, compute_game_stack};
use crate::tendency::{Situation, TendencyReport, tendency_lens};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonReport {
    pub team_id: String,
    pub signature: String,
    pub scheduled_games: u32,
    pub remaining_games: u32,
    pub aggregate: SeasonAggregate,
    pub outlook: SeasonOutlook,
}

/// Entry point for hosts: owns configuration and the stack/season caches.
pub struct AnalyticsEngine {
    config: EngineConfig,
    stacks: SignatureCache<GameStack>,
    seasons: SignatureCache<SeasonReport>,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl AnalyticsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            stacks: SignatureCache::new("stack", config.stack_cache_capacity),
            seasons: SignatureCache::new("season", config.season_cache_capacity),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stack_cache(&self) -> &SignatureCache<GameStack> {
        &self.stacks
    }

    pub fn season_cache(&self) -> &SignatureCache<SeasonReport> {
        &self.seasons
    }

    pub fn clear(&self) {
        self.stacks.clear();
        self.seasons.clear();
    }

    /// Stack for one game and scope. Events for other games are ignored.
    pub fn game_stack(&self, meta: &GameMeta, events: &[PlayEvent], scope: UnitScope) -> Arc<GameStack> {
        let own: Vec<PlayEvent> = events
            .iter()
            .filter(|e| e.game_id == meta.id)
            .cloned()
            .collect();
        let prepared = apply_preferences(&own, &self.config.preferences);
        let scoped: Vec<PlayEvent> = prepared.iter().filter(|e| scope.includes(e)).cloned().collect();
        let meta_parts = meta_signature_parts(meta);
        let mut extras: Vec<&str> = vec![scope.label(), meta.id.as_str()];
        extras.extend(meta_parts.iter().map(String::as_str));
        let signature = stack_signature(&scoped, &extras);
        let key = format!("{}:{}", meta.id, scope.label());
        self.stacks.get_or_compute(&key, &signature, || {
            compute_game_stack(meta, &prepared, scope, signature.clone())
        })
    }

    pub fn game_stacks(&self, games: &[GameMeta], events: &[PlayEvent], scope: UnitScope) -> Vec<Arc<GameStack>> {
        games
            .iter()
            .map(|meta| self.game_stack(meta, events, scope))
            .collect()
    }

    /// Season rollup and projection for `team_id` over every game in `games`.
    pub fn season(&self, team_id: &str, games: &[GameMeta], events: &[PlayEvent]) -> Arc<SeasonReport> {
        let stacks = self.game_stacks(games, events, UnitScope::All);
        let parts: Vec<(&str, &str, u32)> = stacks
            .iter()
            .map(|s| (s.game_id.as_str(), s.signature.as_str(), s.plays))
            .collect();
        let signature = season_signature(&parts);
        let config = &self.config;

        self.seasons.get_or_compute(team_id, &signature, || {
            let refs: Vec<&GameStack> = stacks.iter().map(|s| s.as_ref()).collect();
            let remaining_games = refs
                .iter()
                .filter(|s| s.plays == 0 && !s.meta.is_final())
                .count() as u32;
            debug!(team_id, games = refs.len(), remaining_games, "projecting season");
            SeasonReport {
                team_id: team_id.to_string(),
                signature: signature.clone(),
                scheduled_games: refs.len() as u32,
                remaining_games,
                aggregate: aggregate_season(team_id, &refs),
                outlook: project_season(&refs, remaining_games, &config.simulation),
            }
        })
    }

    /// Tendency lens over `events` (most recent first) using configured thresholds.
    pub fn tendency(&self, unit: ChartUnit, events: &[PlayEvent], current: Option<Situation>) -> TendencyReport {
        let prepared = apply_preferences(events, &self.config.preferences);
        tendency_lens(unit, &prepared, current, self.config.tendency_top_n)
    }
}

/// Schedule fields that flow into a stack (outcome, labels, ordering).
fn meta_signature_parts(meta: &GameMeta) -> [String; 5] {
    [
        meta.status.as_ref().map(|s| s.as_str().to_string()).unwrap_or_default(),
        meta.opponent_name.clone().unwrap_or_default(),
        meta.start_time.map(|t| t.to_rfc3339()).unwrap_or_default(),
        meta.season_label.clone().unwrap_or_default(),
        meta.conference_game.map(|c| c.to_string()).unwrap_or_default(),
    ]
}
