use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::box_score::{BaseCounts, BoxScoreMetrics, is_scoring_play};
use crate::core_metrics::{CoreWinningMetrics, points_per_drive};
use crate::drives::DriveRecord;
use crate::math::{clamp, ratio};
use crate::play::{ChartUnit, PlayEvent, PlayFamily, UNKNOWN_LABEL, in_clock_order};
use crate::win_prob::{
    self, FIELD_GOAL_POINTS, GAME_SECONDS, GameState, RESTART_FIELD_POSITION, SAFETY_POINTS,
    TOUCHDOWN_POINTS, expected_points,
};

const EPA_YARD_WEIGHT: f64 = 0.06;
const EPA_SCORE_WEIGHT: f64 = 2.0;
const EPA_TURNOVER_WEIGHT: f64 = 2.0;
const HAVOC_PENALTY_WEIGHT: f64 = 0.25;

// SP+-style composite anchors (roughly league-average efficiency).
pub(crate) const AVG_SUCCESS_RATE: f64 = 0.42;
pub(crate) const AVG_EXPLOSIVE_RATE: f64 = 0.10;
const AVG_POINTS_PER_DRIVE: f64 = 2.0;
const AVG_ST_YARDS_PER_PLAY: f64 = 10.0;

// Passer-rating component anchors.
const RATING_COMPONENT_MAX: f64 = 2.375;
const RATING_MAX: f64 = 158.3;

/// Extra inputs beyond the unit's own events and box score.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvancedContext<'a> {
    pub drives: Option<&'a [DriveRecord]>,
    pub opponent: Option<&'a BoxScoreMetrics>,
    pub core: Option<&'a CoreWinningMetrics>,
    pub special_teams: Option<&'a BoxScoreMetrics>,
    /// Every snap of the game (all units) for the win-probability timeline.
    pub game_events: Option<&'a [PlayEvent]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEpa {
    pub play_id: String,
    pub ep_before: f64,
    pub ep_after: f64,
    pub epa: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinProbPoint {
    pub play_id: String,
    pub absolute_clock_seconds: Option<i32>,
    pub win_probability: f64,
    pub delta: f64,
    pub leverage: f64,
}

/// Win-probability added, with gains and losses kept apart so they never cancel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WpaShare {
    pub key: String,
    pub plays: u32,
    pub credit: f64,
    pub debit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WpaAttribution {
    pub units: Vec<WpaShare>,
    pub players: Vec<WpaShare>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpPlusRating {
    pub offense: f64,
    pub defense: f64,
    pub special_teams: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PassingSummary {
    pub attempts: u32,
    pub completions: u32,
    pub sacks: u32,
    pub touchdowns: u32,
    pub interceptions: u32,
    pub yards: i32,
    pub sack_yards: i32,
    pub adjusted_net_yards_per_attempt: f64,
    pub qbr: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancedAnalytics {
    pub epa_estimate: f64,
    pub epa_per_play: f64,
    pub havoc_rate: f64,
    pub leverage_rate: f64,
    pub field_position_advantage: f64,
    pub epa_ledger: Vec<PlayEpa>,
    pub ledger_epa_total: f64,
    pub win_probability: Vec<WinProbPoint>,
    pub attribution: WpaAttribution,
    pub post_game_win_expectancy: Option<f64>,
    pub sp_plus: SpPlusRating,
    pub passing: PassingSummary,
}

/// Linear EPA estimate from counting stats alone.
pub fn heuristic_epa(base: &BaseCounts) -> f64 {
    base.total_yards as f64 * EPA_YARD_WEIGHT + base.scoring_plays as f64 * EPA_SCORE_WEIGHT
        - base.turnovers as f64 * EPA_TURNOVER_WEIGHT
}

pub fn compute_advanced(
    events: &[PlayEvent],
    box_score: &BoxScoreMetrics,
    ctx: AdvancedContext<'_>,
) -> AdvancedAnalytics {
    let base = &box_score.base;
    let plays = base.plays as f64;

    let epa_estimate = heuristic_epa(base);
    let havoc_rate = ratio(
        base.turnovers as f64 + HAVOC_PENALTY_WEIGHT * base.penalties.count as f64,
        plays,
    );

    let drives = ctx.drives.unwrap_or(&[]);
    let leverage_rate = leverage_rate(events, drives);
    let field_position_advantage = if drives.is_empty() {
        box_score.yards_per_play
    } else {
        let starts: f64 = drives.iter().map(|d| d.start_field_position as f64).sum();
        ratio(starts, drives.len() as f64)
    };

    let epa_ledger = epa_ledger(events);
    let ledger_epa_total = epa_ledger.iter().map(|p| p.epa).sum();
    let (win_probability, attribution) =
        win_probability_timeline(ctx.game_events.unwrap_or(events));

    let post_game_win_expectancy = ctx.core.filter(|c| c.has_opponent).map(|core| {
        let opp_ppd = ctx.opponent.map(points_per_drive).unwrap_or(0.0);
        win_prob::post_game_win_expectancy(core, opp_ppd)
    });

    AdvancedAnalytics {
        epa_estimate,
        epa_per_play: ratio(epa_estimate, plays),
        havoc_rate,
        leverage_rate,
        field_position_advantage,
        epa_ledger,
        ledger_epa_total,
        win_probability,
        attribution,
        post_game_win_expectancy,
        sp_plus: sp_plus_rating(box_score, ctx.opponent, ctx.special_teams),
        passing: passing_summary(events),
    }
}

fn leverage_rate(events: &[PlayEvent], drives: &[DriveRecord]) -> f64 {
    if events.is_empty() {
        return 0.0;
    }
    let tracked: BTreeSet<i32> = drives.iter().map(|d| d.drive_number).collect();
    let in_drives = events
        .iter()
        .filter(|e| e.drive_number.is_some_and(|d| tracked.contains(&d)))
        .count();
    ratio(in_drives as f64, events.len() as f64)
}

fn is_change_of_possession_kick(e: &PlayEvent) -> bool {
    e.st_play_type
        .as_deref()
        .map(|t| t.to_ascii_uppercase())
        .is_some_and(|t| t.contains("PUNT") || t.contains("KICKOFF"))
}

fn scored_points(e: &PlayEvent) -> i32 {
    let r = e.result_lower();
    if r.contains("safety") {
        -SAFETY_POINTS
    } else if r.contains("fg") || r.contains("field goal") {
        FIELD_GOAL_POINTS
    } else {
        TOUCHDOWN_POINTS
    }
}

/// Expected points before and after each snap, in game-clock order.
pub fn epa_ledger(events: &[PlayEvent]) -> Vec<PlayEpa> {
    in_clock_order(events)
        .into_iter()
        .map(|e| {
            let down = e.down.unwrap_or(1);
            let distance = e.distance.unwrap_or(10);
            let ep_before = expected_points(e.field_position, down, distance);
            let landed = e.field_position.saturating_add(e.yards()).clamp(0, 99);

            let ep_after = if is_scoring_play(e) {
                scored_points(e) as f64
            } else if e.turnover || is_change_of_possession_kick(e) {
                -expected_points(100 - landed, 1, 10)
            } else if e.first_down || e.yards() >= distance {
                expected_points(landed, 1, 10.min(100 - landed))
            } else if down >= 4 {
                -expected_points(100 - landed, 1, 10)
            } else {
                expected_points(landed, down.saturating_add(1), distance.saturating_sub(e.yards()).max(1))
            };

            PlayEpa {
                play_id: e.id.clone(),
                ep_before,
                ep_after,
                epa: ep_after - ep_before,
            }
        })
        .collect()
}

struct Scoreboard {
    team: i32,
    opponent: i32,
}

impl Scoreboard {
    fn sync(&mut self, e: &PlayEvent) {
        if let (Some(f), Some(a)) = (e.score_for, e.score_against) {
            self.team = f;
            self.opponent = a;
        }
    }

    fn apply(&mut self, e: &PlayEvent) {
        if !is_scoring_play(e) {
            return;
        }
        let points = scored_points(e);
        let defending = e.chart_unit() == Some(ChartUnit::Defense);
        match (points < 0, defending, e.turnover) {
            // Safety: points go to whoever didn't have the ball.
            (true, false, _) => self.opponent = self.opponent.saturating_sub(points),
            (true, true, _) => self.team = self.team.saturating_sub(points),
            // Takeaway returned for a score.
            (false, true, true) => self.team = self.team.saturating_add(points),
            (false, true, false) => self.opponent = self.opponent.saturating_add(points),
            (false, false, true) => self.opponent = self.opponent.saturating_add(points),
            (false, false, false) => self.team = self.team.saturating_add(points),
        }
    }
}

fn state_for(e: &PlayEvent, board: &Scoreboard, remaining: i32) -> GameState {
    GameState {
        score_diff: board.team.saturating_sub(board.opponent),
        seconds_remaining: remaining,
        has_ball: e.chart_unit() != Some(ChartUnit::Defense),
        field_position: e.field_position,
        down: e.down.unwrap_or(1),
        distance: e.distance.unwrap_or(10),
    }
}

fn state_after(e: &PlayEvent, board: &Scoreboard, remaining: i32) -> GameState {
    let mut next = state_for(e, board, remaining);
    let landed = e.field_position.saturating_add(e.yards()).clamp(0, 99);
    let distance = e.distance.unwrap_or(10);
    let down = e.down.unwrap_or(1);

    if is_scoring_play(e) {
        next.has_ball = !next.has_ball;
        next.field_position = RESTART_FIELD_POSITION;
        next.down = 1;
        next.distance = 10;
    } else if e.turnover || is_change_of_possession_kick(e) || (down >= 4 && e.yards() < distance && !e.first_down) {
        next.has_ball = !next.has_ball;
        next.field_position = 100 - landed;
        next.down = 1;
        next.distance = 10;
    } else if e.first_down || e.yards() >= distance {
        next.field_position = landed;
        next.down = 1;
        next.distance = 10.min(100 - landed);
    } else {
        next.field_position = landed;
        next.down = down.saturating_add(1);
        next.distance = distance.saturating_sub(e.yards()).max(1);
    }
    next
}

/// Team and opponent points after replaying every snap.
pub fn final_score(events: &[PlayEvent]) -> (i32, i32) {
    let mut board = Scoreboard {
        team: 0,
        opponent: 0,
    };
    for e in in_clock_order(events) {
        board.sync(e);
        board.apply(e);
    }
    (board.team, board.opponent)
}

/// Win probability after every snap plus cancellation-free attribution of the swings.
pub fn win_probability_timeline(events: &[PlayEvent]) -> (Vec<WinProbPoint>, WpaAttribution) {
    let ordered = in_clock_order(events);
    let mut board = Scoreboard {
        team: 0,
        opponent: 0,
    };
    let mut remaining = GAME_SECONDS;
    let mut points: Vec<WinProbPoint> = Vec::with_capacity(ordered.len());
    let mut units: BTreeMap<String, WpaShare> = BTreeMap::new();
    let mut players: BTreeMap<String, WpaShare> = BTreeMap::new();

    for e in &ordered {
        if let Some(clock) = e.absolute_clock_seconds {
            remaining = GAME_SECONDS.saturating_sub(clock).max(0);
        }
        board.sync(e);
        let before = win_prob::compute_win_prob(&state_for(e, &board, remaining));
        board.apply(e);
        let after = win_prob::compute_win_prob(&state_after(e, &board, remaining));
        let delta = after - before;

        let unit_key = e
            .unit
            .as_ref()
            .map(|u| u.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        credit(&mut units, &unit_key, delta);
        for player in &e.player_ids {
            credit(&mut players, player, delta);
        }

        points.push(WinProbPoint {
            play_id: e.id.clone(),
            absolute_clock_seconds: e.absolute_clock_seconds,
            win_probability: after,
            delta,
            leverage: 0.0,
        });
    }

    let mean_swing = ratio(
        points.iter().map(|p| p.delta.abs()).sum(),
        points.len() as f64,
    );
    for p in &mut points {
        p.leverage = ratio(p.delta.abs(), mean_swing);
    }

    let attribution = WpaAttribution {
        units: units.into_values().collect(),
        players: players.into_values().collect(),
    };
    (points, attribution)
}

fn credit(book: &mut BTreeMap<String, WpaShare>, key: &str, delta: f64) {
    let share = book.entry(key.to_string()).or_insert_with(|| WpaShare {
        key: key.to_string(),
        ..WpaShare::default()
    });
    share.plays += 1;
    if delta >= 0.0 {
        share.credit += delta;
    } else {
        share.debit += delta;
    }
}

fn efficiency_rating(b: &BoxScoreMetrics) -> f64 {
    30.0 * (b.success_rate - AVG_SUCCESS_RATE)
        + 40.0 * (b.explosive_rate - AVG_EXPLOSIVE_RATE)
        + 2.0 * (points_per_drive(b) - AVG_POINTS_PER_DRIVE)
}

pub fn sp_plus_rating(
    own: &BoxScoreMetrics,
    opponent: Option<&BoxScoreMetrics>,
    special_teams: Option<&BoxScoreMetrics>,
) -> SpPlusRating {
    if own.base.plays == 0 {
        return SpPlusRating::default();
    }
    let offense = efficiency_rating(own);
    let defense = opponent
        .filter(|o| o.base.plays > 0)
        .map(|o| -efficiency_rating(o))
        .unwrap_or(0.0);
    let special_teams = special_teams
        .filter(|s| s.base.plays > 0)
        .map(|s| {
            0.5 * (s.yards_per_play - AVG_ST_YARDS_PER_PLAY) / AVG_ST_YARDS_PER_PLAY * 10.0
                + 5.0 * s.explosive_rate
                - 10.0 * ratio(s.base.turnovers as f64, s.base.plays as f64)
        })
        .unwrap_or(0.0);
    SpPlusRating {
        offense,
        defense,
        special_teams,
        overall: offense + defense + special_teams,
    }
}

pub fn passing_summary(events: &[PlayEvent]) -> PassingSummary {
    let mut out = PassingSummary::default();
    for e in events.iter().filter(|e| e.family() == Some(PlayFamily::Pass)) {
        let r = e.result_lower();
        if r.contains("sack") {
            out.sacks += 1;
            out.sack_yards = out.sack_yards.saturating_add(e.yards().min(0).saturating_neg());
            continue;
        }
        out.attempts += 1;
        let intercepted = e.turnover
            && (r.contains("int") || e.turnover_detail_type.as_deref() == Some("INT"));
        if intercepted {
            out.interceptions += 1;
            continue;
        }
        let incomplete = r.contains("incomplete") || r == "inc";
        let touchdown = is_scoring_play(e) && (r.contains("td") || r.contains("touchdown") || r.is_empty());
        if touchdown {
            out.touchdowns += 1;
        }
        if !incomplete && (r.contains("complete") || e.yards() != 0 || touchdown) {
            out.completions += 1;
            out.yards = out.yards.saturating_add(e.yards());
        }
    }

    let att = out.attempts as f64;
    out.adjusted_net_yards_per_attempt = ratio(
        out.yards as f64 + 20.0 * out.touchdowns as f64
            - 45.0 * out.interceptions as f64
            - out.sack_yards as f64,
        att + out.sacks as f64,
    );
    out.qbr = if out.attempts == 0 {
        0.0
    } else {
        let part = |v: f64| clamp(v, 0.0, RATING_COMPONENT_MAX);
        let a = part((ratio(out.completions as f64, att) - 0.3) * 5.0);
        let b = part((ratio(out.yards as f64, att) - 3.0) * 0.25);
        let c = part(ratio(out.touchdowns as f64, att) * 20.0);
        let d = part(RATING_COMPONENT_MAX - ratio(out.interceptions as f64, att) * 25.0);
        let rating = (a + b + c + d) / 6.0 * 100.0;
        ratio(rating, RATING_MAX) * 100.0
    };
    out
}
