use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::advanced::{AVG_EXPLOSIVE_RATE, AVG_SUCCESS_RATE, heuristic_epa};
use crate::config::SimulationConfig;
use crate::core_metrics::points_per_drive;
use crate::math::{clamp, logistic, mean, ratio};
use crate::stack::{GameOutcome, GameStack};

pub const WIN_RATE_FLOOR: f64 = 0.01;
pub const WIN_RATE_CEIL: f64 = 0.99;
const CONTROL_TO_WIN_SCALE: f64 = 2.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub game_id: String,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonTrends {
    pub success_rate: Vec<TrendPoint>,
    pub explosive_margin: Vec<TrendPoint>,
    pub turnover_margin: Vec<TrendPoint>,
    pub scoring_differential: Vec<TrendPoint>,
    pub game_control: Vec<TrendPoint>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl Record {
    pub fn decided(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// Ties count as half a win.
    pub fn win_rate(&self) -> f64 {
        ratio(self.wins as f64 + 0.5 * self.ties as f64, self.decided() as f64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecialTeamsSplit {
    pub plays: u32,
    pub epa_per_play: f64,
    pub explosive_rate: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DefensiveSplit {
    pub late_down_stop_rate: f64,
    pub red_zone_trips_allowed_per_game: f64,
    pub takeaways_per_game: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonAggregate {
    pub team_id: String,
    pub games: u32,
    pub plays: u32,
    pub record: Record,
    pub turnover_margin_per_game: f64,
    pub scoring_differential_per_game: f64,
    pub points_for_per_game: f64,
    pub points_against_per_game: f64,
    pub explosive_rate: f64,
    pub explosive_rate_allowed: f64,
    pub success_rate: f64,
    pub success_rate_allowed: f64,
    pub points_per_drive: f64,
    pub red_zone_efficiency: f64,
    pub special_teams: SpecialTeamsSplit,
    pub defense: DefensiveSplit,
    pub trends: SeasonTrends,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSimulation {
    pub iterations: u32,
    pub seed: u64,
    pub scheduled_games: u32,
    pub remaining_games: u32,
    pub expected_wins: f64,
    /// Index = total season wins; value = share of simulated seasons.
    pub win_distribution: Vec<f64>,
    pub playoff_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonProjection {
    pub games_modeled: u32,
    pub projected_win_rate: f64,
    pub projected_conference_win_rate: f64,
    pub projected_points_for: f64,
    pub projected_points_against: f64,
    pub strength_of_schedule: f64,
    pub strength_of_record: f64,
    pub playoff_probability: f64,
    pub game_control_index: f64,
    pub simulation: SeasonSimulation,
}

/// "No games yet" is a distinct answer from a computed projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeasonOutlook {
    InsufficientData { games_modeled: u32 },
    Projected(SeasonProjection),
}

impl SeasonOutlook {
    pub fn projection(&self) -> Option<&SeasonProjection> {
        match self {
            SeasonOutlook::Projected(p) => Some(p),
            SeasonOutlook::InsufficientData { .. } => None,
        }
    }
}

fn played<'a>(stacks: &[&'a GameStack]) -> Vec<&'a GameStack> {
    let mut out: Vec<&GameStack> = stacks.iter().copied().filter(|s| s.plays > 0).collect();
    out.sort_by(|a, b| match (a.meta.start_time, b.meta.start_time) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.game_id.cmp(&b.game_id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.game_id.cmp(&b.game_id),
    });
    out
}

fn trend_label(s: &GameStack) -> String {
    s.meta
        .opponent_name
        .clone()
        .unwrap_or_else(|| s.game_id.clone())
}

fn opponent_ppd(s: &GameStack) -> f64 {
    s.stack.opponent_box.as_ref().map(points_per_drive).unwrap_or(0.0)
}

/// Single-game dominance signal from margins; positive favours the team.
pub fn game_control(s: &GameStack) -> f64 {
    let core = &s.stack.core;
    2.0 * core.success_margin
        + 0.05 * core.explosive_margin as f64
        + 0.15 * core.turnover_margin as f64
        + 0.1 * (core.points_per_drive - opponent_ppd(s))
}

fn avg(values: impl Iterator<Item = f64>) -> f64 {
    let v: Vec<f64> = values.collect();
    mean(&v).unwrap_or(0.0)
}

pub fn aggregate_season(team_id: &str, stacks: &[&GameStack]) -> SeasonAggregate {
    let games = played(stacks);
    let mut out = SeasonAggregate {
        team_id: team_id.to_string(),
        games: games.len() as u32,
        ..SeasonAggregate::default()
    };
    if games.is_empty() {
        return out;
    }

    for s in &games {
        out.plays += s.plays;
        match s.stack.summary.outcome {
            Some(GameOutcome::Win) => out.record.wins += 1,
            Some(GameOutcome::Loss) => out.record.losses += 1,
            Some(GameOutcome::Tie) => out.record.ties += 1,
            None => {}
        }
    }

    let diff = |s: &GameStack| s.stack.summary.points_for as f64 - s.stack.summary.points_against as f64;
    out.turnover_margin_per_game = avg(games.iter().map(|s| s.stack.core.turnover_margin as f64));
    out.scoring_differential_per_game = avg(games.iter().map(|s| diff(s)));
    out.points_for_per_game = avg(games.iter().map(|s| s.stack.summary.points_for as f64));
    out.points_against_per_game = avg(games.iter().map(|s| s.stack.summary.points_against as f64));
    out.explosive_rate = avg(games.iter().map(|s| s.stack.box_score.explosive_rate));
    out.success_rate = avg(games.iter().map(|s| s.stack.box_score.success_rate));
    out.points_per_drive = avg(games.iter().map(|s| s.stack.core.points_per_drive));
    out.red_zone_efficiency = avg(games.iter().map(|s| s.stack.core.red_zone_efficiency));

    let opponents: Vec<_> = games.iter().filter_map(|s| s.stack.opponent_box.as_ref()).collect();
    out.explosive_rate_allowed = avg(opponents.iter().map(|o| o.explosive_rate));
    out.success_rate_allowed = avg(opponents.iter().map(|o| o.success_rate));
    let late_attempts: u32 = opponents.iter().map(|o| o.late_down.attempts).sum();
    let late_conversions: u32 = opponents.iter().map(|o| o.late_down.conversions).sum();
    out.defense = DefensiveSplit {
        late_down_stop_rate: if late_attempts == 0 {
            0.0
        } else {
            1.0 - ratio(late_conversions as f64, late_attempts as f64)
        },
        red_zone_trips_allowed_per_game: ratio(
            opponents.iter().map(|o| o.red_zone_trips as f64).sum(),
            games.len() as f64,
        ),
        takeaways_per_game: ratio(
            opponents.iter().map(|o| o.base.turnovers as f64).sum(),
            games.len() as f64,
        ),
    };

    let specials: Vec<_> = games.iter().filter_map(|s| s.stack.special_teams.as_ref()).collect();
    let st_plays: u32 = specials.iter().map(|b| b.base.plays).sum();
    let st_epa: f64 = specials.iter().map(|b| heuristic_epa(&b.base)).sum();
    out.special_teams = SpecialTeamsSplit {
        plays: st_plays,
        epa_per_play: ratio(st_epa, st_plays as f64),
        explosive_rate: ratio(
            specials.iter().map(|b| b.base.explosives as f64).sum(),
            st_plays as f64,
        ),
    };

    let point = |s: &GameStack, value: f64| TrendPoint {
        game_id: s.game_id.clone(),
        label: trend_label(s),
        value,
    };
    for s in &games {
        let t = &mut out.trends;
        t.success_rate.push(point(s, s.stack.box_score.success_rate));
        t.explosive_margin.push(point(s, s.stack.core.explosive_margin as f64));
        t.turnover_margin.push(point(s, s.stack.core.turnover_margin as f64));
        t.scoring_differential.push(point(s, diff(s)));
        t.game_control.push(point(s, game_control(s)));
    }
    out
}

fn win_rate_from_control(control: f64) -> f64 {
    clamp(logistic(CONTROL_TO_WIN_SCALE * control), WIN_RATE_FLOOR, WIN_RATE_CEIL)
}

fn opponent_quality(s: &GameStack) -> Option<f64> {
    let o = s.stack.opponent_box.as_ref()?;
    Some(clamp(
        0.5 + (o.success_rate - AVG_SUCCESS_RATE) + (o.explosive_rate - AVG_EXPLOSIVE_RATE),
        0.0,
        1.0,
    ))
}

/// Project the season from every played game. `remaining_games` are scheduled games with no snaps.
pub fn project_season(
    stacks: &[&GameStack],
    remaining_games: u32,
    sim: &SimulationConfig,
) -> SeasonOutlook {
    let games = played(stacks);
    if games.is_empty() {
        return SeasonOutlook::InsufficientData { games_modeled: 0 };
    }

    let controls: Vec<f64> = games.iter().map(|s| game_control(s)).collect();
    let game_control_index = mean(&controls).unwrap_or(0.0);
    let projected_win_rate = win_rate_from_control(game_control_index);

    let conference: Vec<f64> = games
        .iter()
        .filter(|s| s.meta.conference_game == Some(true))
        .map(|s| game_control(s))
        .collect();
    let projected_conference_win_rate = mean(&conference)
        .map(win_rate_from_control)
        .unwrap_or(projected_win_rate);

    let qualities: Vec<f64> = games.iter().filter_map(|s| opponent_quality(s)).collect();
    let strength_of_schedule = mean(&qualities).unwrap_or(0.5);

    let mut record = Record::default();
    let mut undecided = 0u32;
    for s in &games {
        match s.stack.summary.outcome {
            Some(GameOutcome::Win) => record.wins += 1,
            Some(GameOutcome::Loss) => record.losses += 1,
            Some(GameOutcome::Tie) => record.ties += 1,
            None => undecided += 1,
        }
    }
    let strength_of_record = if record.decided() == 0 {
        0.0
    } else {
        record.win_rate() - projected_win_rate
    };

    let simulation = simulate_season(
        record,
        undecided + remaining_games,
        projected_win_rate,
        remaining_games,
        sim,
    );

    SeasonOutlook::Projected(SeasonProjection {
        games_modeled: games.len() as u32,
        projected_win_rate,
        projected_conference_win_rate,
        projected_points_for: avg(games.iter().map(|s| s.stack.summary.points_for as f64)),
        projected_points_against: avg(games.iter().map(|s| s.stack.summary.points_against as f64)),
        strength_of_schedule,
        strength_of_record,
        playoff_probability: simulation.playoff_probability,
        game_control_index,
        simulation,
    })
}

/// Seeded Monte-Carlo over the undecided part of the schedule.
pub fn simulate_season(
    record: Record,
    open_games: u32,
    win_rate: f64,
    remaining_games: u32,
    sim: &SimulationConfig,
) -> SeasonSimulation {
    let scheduled = record.decided() + open_games;
    let p = clamp(win_rate, 0.0, 1.0);
    let iterations = sim.iterations.max(1);
    let mut rng = ChaCha8Rng::seed_from_u64(sim.seed);
    let mut counts = vec![0u32; scheduled as usize + 1];
    let mut playoff_hits = 0u32;

    for _ in 0..iterations {
        let mut wins = record.wins as f64 + 0.5 * record.ties as f64;
        for _ in 0..open_games {
            if rng.gen_bool(p) {
                wins += 1.0;
            }
        }
        let slot = (wins.floor() as usize).min(scheduled as usize);
        counts[slot] += 1;
        if ratio(wins, scheduled as f64) >= sim.playoff_win_rate {
            playoff_hits += 1;
        }
    }

    let n = iterations as f64;
    let win_distribution: Vec<f64> = counts.iter().map(|c| *c as f64 / n).collect();
    let expected_wins = win_distribution
        .iter()
        .enumerate()
        .map(|(w, share)| w as f64 * share)
        .sum();

    SeasonSimulation {
        iterations,
        seed: sim.seed,
        scheduled_games: scheduled,
        remaining_games,
        expected_wins,
        win_distribution,
        playoff_probability: playoff_hits as f64 / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_win_rate_counts_ties_as_half() {
        let r = Record {
            wins: 2,
            losses: 1,
            ties: 1,
        };
        assert_eq!(r.decided(), 4);
        assert!((r.win_rate() - 0.625).abs() < 1e-9);
        assert_eq!(Record::default().win_rate(), 0.0);
    }

    #[test]
    fn simulation_is_reproducible_for_a_seed() {
        let sim = SimulationConfig {
            iterations: 500,
            seed: 7,
            playoff_win_rate: 0.6,
        };
        let record = Record {
            wins: 3,
            losses: 1,
            ties: 0,
        };
        let a = simulate_season(record, 6, 0.55, 6, &sim);
        let b = simulate_season(record, 6, 0.55, 6, &sim);
        assert_eq!(a, b);
        assert_eq!(a.scheduled_games, 10);
        assert_eq!(a.win_distribution.len(), 11);
        assert!(a.win_distribution[..3].iter().all(|s| *s == 0.0));
        let total: f64 = a.win_distribution.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(a.expected_wins > 3.0 && a.expected_wins < 9.0);
    }

    #[test]
    fn simulation_without_open_games_is_settled() {
        let sim = SimulationConfig::default();
        let record = Record {
            wins: 8,
            losses: 2,
            ties: 0,
        };
        let s = simulate_season(record, 0, 0.5, 0, &sim);
        assert_eq!(s.expected_wins, 8.0);
        assert_eq!(s.playoff_probability, 1.0);
    }

    #[test]
    fn no_games_is_insufficient_data() {
        let outlook = project_season(&[], 4, &SimulationConfig::default());
        assert_eq!(outlook, SeasonOutlook::InsufficientData { games_modeled: 0 });
        assert!(outlook.projection().is_none());
        let json = serde_json::to_value(&outlook).unwrap();
        assert_eq!(json["status"], "INSUFFICIENT_DATA");
    }

    #[test]
    fn win_rate_is_clamped() {
        assert_eq!(win_rate_from_control(100.0), WIN_RATE_CEIL);
        assert_eq!(win_rate_from_control(-100.0), WIN_RATE_FLOOR);
        assert!((win_rate_from_control(0.0) - 0.5).abs() < 1e-9);
    }
}
