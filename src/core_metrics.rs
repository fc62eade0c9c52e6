use serde::{Deserialize, Serialize};

use crate::box_score::BoxScoreMetrics;
use crate::math::{clamp, ratio};

const POINTS_PER_SCORE: f64 = 7.0;
const POINTS_PER_LATE_CONVERSION: f64 = 1.5;
const POINTS_PER_TURNOVER: f64 = 3.0;
const MAX_POINTS_PER_DRIVE: f64 = 7.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreWinningMetrics {
    pub has_opponent: bool,
    pub explosive_margin: i64,
    pub success_margin: f64,
    pub turnover_margin: i64,
    pub red_zone_efficiency: f64,
    pub points_per_drive: f64,
}

/// Margins against `opponent`; a missing opponent counts as all zeros.
pub fn compute_core_metrics(
    own: &BoxScoreMetrics,
    opponent: Option<&BoxScoreMetrics>,
) -> CoreWinningMetrics {
    let (opp_explosives, opp_success_rate, opp_turnovers) = opponent
        .map(|o| (o.base.explosives, o.success_rate, o.base.turnovers))
        .unwrap_or((0, 0.0, 0));

    CoreWinningMetrics {
        has_opponent: opponent.is_some(),
        explosive_margin: own.base.explosives as i64 - opp_explosives as i64,
        success_margin: own.success_rate - opp_success_rate,
        turnover_margin: opp_turnovers as i64 - own.base.turnovers as i64,
        red_zone_efficiency: ratio(own.base.scoring_plays as f64, own.red_zone_trips as f64),
        points_per_drive: points_per_drive(own),
    }
}

/// Scoring plays and late-down conversions net of turnovers, per late-down attempt (floor 1).
pub fn points_per_drive(own: &BoxScoreMetrics) -> f64 {
    let raw = own.base.scoring_plays as f64 * POINTS_PER_SCORE
        + own.late_down.conversions as f64 * POINTS_PER_LATE_CONVERSION
        - own.base.turnovers as f64 * POINTS_PER_TURNOVER;
    let attempts = own.late_down.attempts.max(1) as f64;
    clamp(ratio(raw, attempts), 0.0, MAX_POINTS_PER_DRIVE)
}
