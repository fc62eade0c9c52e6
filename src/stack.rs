use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::advanced::{AdvancedAnalytics, AdvancedContext, compute_advanced, final_score};
use crate::box_score::{BoxScoreMetrics, compute_box_score};
use crate::core_metrics::{CoreWinningMetrics, compute_core_metrics};
use crate::drives::{DriveRecord, build_drives};
use crate::play::{ChartUnit, CodeLabel, GameMeta, PlayEvent, PlayFamily};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitScope {
    All,
    Offense,
    Defense,
    SpecialTeams,
}

impl UnitScope {
    pub fn label(self) -> &'static str {
        match self {
            UnitScope::All => "ALL",
            UnitScope::Offense => ChartUnit::Offense.code(),
            UnitScope::Defense => ChartUnit::Defense.code(),
            UnitScope::SpecialTeams => ChartUnit::SpecialTeams.code(),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let folded = raw.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        if folded == "ALL" {
            return Some(UnitScope::All);
        }
        ChartUnit::from_code(&folded).map(UnitScope::from)
    }

    pub fn includes(self, e: &PlayEvent) -> bool {
        match self {
            UnitScope::All => true,
            UnitScope::Offense => effective_unit(e) == ChartUnit::Offense,
            UnitScope::Defense => effective_unit(e) == ChartUnit::Defense,
            UnitScope::SpecialTeams => effective_unit(e) == ChartUnit::SpecialTeams,
        }
    }
}

impl From<ChartUnit> for UnitScope {
    fn from(unit: ChartUnit) -> Self {
        match unit {
            ChartUnit::Offense => UnitScope::Offense,
            ChartUnit::Defense => UnitScope::Defense,
            ChartUnit::SpecialTeams => UnitScope::SpecialTeams,
        }
    }
}

/// Charted unit, falling back to the play family when the row didn't say. Uncharted rows are
/// never defense.
pub fn effective_unit(e: &PlayEvent) -> ChartUnit {
    if let Some(u) = e.chart_unit() {
        return u;
    }
    if e.family() == Some(PlayFamily::SpecialTeams) {
        ChartUnit::SpecialTeams
    } else {
        ChartUnit::Offense
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameOutcome {
    Win,
    Loss,
    Tie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub plays: u32,
    pub points_for: i32,
    pub points_against: i32,
    /// Only set once the game is final.
    pub outcome: Option<GameOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackBody {
    pub box_score: BoxScoreMetrics,
    pub opponent_box: Option<BoxScoreMetrics>,
    pub special_teams: Option<BoxScoreMetrics>,
    pub core: CoreWinningMetrics,
    pub advanced: AdvancedAnalytics,
    pub drives: Vec<DriveRecord>,
    pub summary: GameSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStack {
    pub game_id: String,
    pub unit: UnitScope,
    pub meta: GameMeta,
    pub stack: StackBody,
    pub plays: u32,
    pub last_event_at: Option<DateTime<Utc>>,
    pub signature: String,
}

/// Build the stack for one game. `events` must already belong to `meta`'s game.
pub fn compute_game_stack(
    meta: &GameMeta,
    events: &[PlayEvent],
    scope: UnitScope,
    signature: String,
) -> GameStack {
    let scoped: Vec<PlayEvent> = events
        .iter()
        .filter(|e| scope.includes(e))
        .cloned()
        .collect();

    let stack = match scope {
        UnitScope::All => full_game_body(meta, events),
        _ => unit_body(meta, &scoped),
    };

    GameStack {
        game_id: meta.id.clone(),
        unit: scope,
        meta: meta.clone(),
        plays: scoped.len() as u32,
        last_event_at: scoped.iter().filter_map(|e| e.created_at).max(),
        signature,
        stack,
    }
}

fn split(events: &[PlayEvent], unit: ChartUnit) -> Vec<PlayEvent> {
    events
        .iter()
        .filter(|e| effective_unit(e) == unit)
        .cloned()
        .collect()
}

fn non_empty_box(events: &[PlayEvent]) -> Option<BoxScoreMetrics> {
    (!events.is_empty()).then(|| compute_box_score(events))
}

fn full_game_body(meta: &GameMeta, events: &[PlayEvent]) -> StackBody {
    let offense = split(events, ChartUnit::Offense);
    let defense = split(events, ChartUnit::Defense);
    let special = split(events, ChartUnit::SpecialTeams);

    let box_score = compute_box_score(&offense);
    let opponent_box = non_empty_box(&defense);
    let special_teams = non_empty_box(&special);
    let drives = build_drives(&offense);
    let core = compute_core_metrics(&box_score, opponent_box.as_ref());
    let advanced = compute_advanced(
        &offense,
        &box_score,
        AdvancedContext {
            drives: Some(&drives),
            opponent: opponent_box.as_ref(),
            core: Some(&core),
            special_teams: special_teams.as_ref(),
            game_events: Some(events),
        },
    );

    StackBody {
        summary: summarize(meta, events),
        box_score,
        opponent_box,
        special_teams,
        core,
        advanced,
        drives,
    }
}

fn unit_body(meta: &GameMeta, events: &[PlayEvent]) -> StackBody {
    let box_score = compute_box_score(events);
    let drives = build_drives(events);
    let core = compute_core_metrics(&box_score, None);
    let advanced = compute_advanced(
        events,
        &box_score,
        AdvancedContext {
            drives: Some(&drives),
            core: Some(&core),
            ..AdvancedContext::default()
        },
    );
    StackBody {
        summary: summarize(meta, events),
        box_score,
        opponent_box: None,
        special_teams: None,
        core,
        advanced,
        drives,
    }
}

fn summarize(meta: &GameMeta, events: &[PlayEvent]) -> GameSummary {
    let (points_for, points_against) = final_score(events);
    let outcome = meta.is_final().then(|| {
        if points_for > points_against {
            GameOutcome::Win
        } else if points_for < points_against {
            GameOutcome::Loss
        } else {
            GameOutcome::Tie
        }
    });
    GameSummary {
        plays: events.len() as u32,
        points_for,
        points_against,
        outcome,
    }
}
