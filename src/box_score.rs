use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::math::{mean, ratio};
use crate::play::{AnalyticsPreferences, FieldZone, PlayEvent, PlayFamily, in_clock_order};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplosiveThresholds {
    pub run: i32,
    pub pass: i32,
    pub special_teams: i32,
    pub any_play: i32,
}

impl Default for ExplosiveThresholds {
    fn default() -> Self {
        Self {
            run: 12,
            pass: 15,
            special_teams: 25,
            any_play: 40,
        }
    }
}

impl ExplosiveThresholds {
    pub fn from_preferences(prefs: &AnalyticsPreferences) -> Self {
        Self {
            run: prefs.explosive_run,
            pass: prefs.explosive_pass,
            ..Self::default()
        }
    }
}

pub fn classify_explosive(
    gained_yards: Option<i32>,
    family: Option<PlayFamily>,
    thresholds: &ExplosiveThresholds,
) -> bool {
    let Some(gained) = gained_yards else {
        return false;
    };
    if gained >= thresholds.any_play {
        return true;
    }
    let needed = match family {
        Some(PlayFamily::Pass) => thresholds.pass,
        Some(PlayFamily::SpecialTeams) => thresholds.special_teams,
        Some(PlayFamily::Run) | None => thresholds.run,
    };
    gained >= needed
}

/// `None` when the play lacks down, distance or gain and so can't be judged.
pub fn is_success(down: Option<i32>, distance: Option<i32>, gained: Option<i32>) -> Option<bool> {
    let (down, distance, gained) = (down?, distance?, gained?);
    let (gained, distance) = (gained as f64, distance as f64);
    let ok = match down {
        1 => gained >= 0.5 * distance,
        2 => gained >= 0.7 * distance,
        _ => gained >= distance,
    };
    Some(ok)
}

pub fn play_success(e: &PlayEvent) -> Option<bool> {
    is_success(e.down, e.distance, e.gained_yards)
}

pub fn is_scoring_play(e: &PlayEvent) -> bool {
    if e.scoring {
        return true;
    }
    let r = e.result_lower();
    if r.is_empty() {
        return false;
    }
    ["td", "touchdown", "fg", "field goal", "safety"]
        .iter()
        .any(|needle| r.contains(needle))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PenaltyTotals {
    pub count: u32,
    pub yards: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseCounts {
    pub plays: u32,
    pub total_yards: i64,
    pub explosives: u32,
    pub scoring_plays: u32,
    pub turnovers: u32,
    pub penalties: PenaltyTotals,
    pub first_downs: u32,
    pub drives: u32,
}

pub fn count_base(events: &[PlayEvent]) -> BaseCounts {
    let mut out = BaseCounts::default();
    let mut drive_numbers: BTreeSet<i32> = BTreeSet::new();

    for e in events {
        out.plays += 1;
        out.total_yards += e.yards() as i64;
        if e.explosive {
            out.explosives += 1;
        }
        if is_scoring_play(e) {
            out.scoring_plays += 1;
        }
        if e.turnover {
            out.turnovers += 1;
        }
        if e.first_down {
            out.first_downs += 1;
        }
        for p in e.penalties.iter().filter(|p| p.occurred) {
            out.penalties.count += 1;
            out.penalties.yards = out.penalties.yards.saturating_add(p.yards);
        }
        if let Some(d) = e.drive_number {
            drive_numbers.insert(d);
        }
    }

    out.drives = if !drive_numbers.is_empty() {
        drive_numbers.len() as u32
    } else if out.plays > 0 {
        1
    } else {
        0
    };
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LateDown {
    pub attempts: u32,
    pub conversions: u32,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxScoreMetrics {
    #[serde(flatten)]
    pub base: BaseCounts,
    pub yards_per_play: f64,
    pub explosive_rate: f64,
    pub success_eligible: u32,
    pub successes: u32,
    pub success_rate: f64,
    pub late_down: LateDown,
    pub red_zone_trips: u32,
    /// Mean opening field position across drives; `None` without drive data.
    pub average_start: Option<f64>,
    /// Mean snap field position; `None` without plays.
    pub average_depth: Option<f64>,
}

pub fn compute_box_score(events: &[PlayEvent]) -> BoxScoreMetrics {
    let base = count_base(events);
    let plays = base.plays as f64;

    let mut success_eligible = 0u32;
    let mut successes = 0u32;
    let mut late = LateDown::default();
    // `None` key stands for plays charted without a drive number.
    let mut red_zone_drives: BTreeSet<Option<i32>> = BTreeSet::new();

    for e in events {
        let success = play_success(e);
        if let Some(ok) = success {
            success_eligible += 1;
            if ok {
                successes += 1;
            }
        }
        if e.down.is_some_and(|d| d >= 3) {
            late.attempts += 1;
            if success == Some(true) || e.first_down {
                late.conversions += 1;
            }
        }
        if e.field_zone == FieldZone::RedZone {
            red_zone_drives.insert(e.drive_number);
        }
    }
    late.rate = ratio(late.conversions as f64, late.attempts as f64);

    let depths: Vec<f64> = events.iter().map(|e| e.field_position as f64).collect();

    BoxScoreMetrics {
        yards_per_play: ratio(base.total_yards as f64, plays),
        explosive_rate: ratio(base.explosives as f64, plays),
        success_eligible,
        successes,
        success_rate: ratio(successes as f64, success_eligible as f64),
        late_down: late,
        red_zone_trips: red_zone_drives.len() as u32,
        average_start: average_drive_start(events),
        average_depth: mean(&depths),
        base,
    }
}

fn average_drive_start(events: &[PlayEvent]) -> Option<f64> {
    let mut first_by_drive: BTreeMap<i32, i32> = BTreeMap::new();
    for e in in_clock_order(events) {
        if let Some(d) = e.drive_number {
            first_by_drive.entry(d).or_insert(e.field_position);
        }
    }
    let starts: Vec<f64> = first_by_drive.values().map(|v| *v as f64).collect();
    mean(&starts)
}
