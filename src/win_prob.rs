use crate::core_metrics::CoreWinningMetrics;
use crate::math::{clamp, logistic};

pub const GAME_SECONDS: i32 = 3600;

// Expected-points baseline: linear in field position, penalised by down and distance.
const EP_INTERCEPT: f64 = -1.0;
const EP_PER_YARD: f64 = 0.075;
const EP_PER_DOWN: f64 = 0.45;
const EP_PER_YARD_TO_GO: f64 = 0.04;
const EP_MIN: f64 = -2.5;
const EP_MAX: f64 = 6.8;

// Logistic steepness ramps cubically so late leads are near-certain.
const K_EARLY: f64 = 0.10;
const K_LATE: f64 = 0.55;
const WP_FLOOR: f64 = 0.001;
const WP_CEIL: f64 = 0.999;

pub const TOUCHDOWN_POINTS: i32 = 7;
pub const FIELD_GOAL_POINTS: i32 = 3;
pub const SAFETY_POINTS: i32 = 2;
/// Where the receiving team is assumed to start after a score.
pub const RESTART_FIELD_POSITION: i32 = 25;

/// Expected points for the team in possession at `yard_line` (0 own goal, 100 opponent goal).
pub fn expected_points(yard_line: i32, down: i32, distance: i32) -> f64 {
    let yl = yard_line.clamp(0, 100) as f64;
    let down = down.clamp(1, 4) as f64;
    let to_go = distance.clamp(1, 99) as f64;
    let ep = EP_INTERCEPT + EP_PER_YARD * yl
        - EP_PER_DOWN * (down - 1.0)
        - EP_PER_YARD_TO_GO * (to_go - 10.0);
    clamp(ep, EP_MIN, EP_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameState {
    /// Team score minus opponent score.
    pub score_diff: i32,
    pub seconds_remaining: i32,
    pub has_ball: bool,
    /// From the perspective of whoever has the ball.
    pub field_position: i32,
    pub down: i32,
    pub distance: i32,
}

impl GameState {
    pub fn kickoff() -> Self {
        Self {
            score_diff: 0,
            seconds_remaining: GAME_SECONDS,
            has_ball: true,
            field_position: RESTART_FIELD_POSITION,
            down: 1,
            distance: 10,
        }
    }
}

/// Team win probability in [0, 1].
pub fn compute_win_prob(state: &GameState) -> f64 {
    let remaining = state.seconds_remaining.clamp(0, GAME_SECONDS);
    if remaining == 0 {
        return if state.score_diff > 0 {
            1.0
        } else if state.score_diff < 0 {
            0.0
        } else {
            0.5
        };
    }

    let ep = expected_points(state.field_position, state.down, state.distance);
    let possession_value = if state.has_ball { ep } else { -ep };
    let adjusted = state.score_diff as f64 + possession_value;

    let elapsed = 1.0 - remaining as f64 / GAME_SECONDS as f64;
    let k = K_EARLY + elapsed.powi(3) * K_LATE;
    clamp(logistic(k * adjusted), WP_FLOOR, WP_CEIL)
}

/// Post-game "should have won" estimate from how the game was played, not the scoreboard.
pub fn post_game_win_expectancy(core: &CoreWinningMetrics, opponent_points_per_drive: f64) -> f64 {
    let signal = 4.0 * core.success_margin
        + 0.2 * core.explosive_margin as f64
        + 0.5 * core.turnover_margin as f64
        + 0.3 * (core.points_per_drive - opponent_points_per_drive);
    clamp(logistic(signal), WP_FLOOR, WP_CEIL)
}
