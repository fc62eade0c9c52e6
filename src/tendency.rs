use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::box_score::play_success;
use crate::math::ratio;
use crate::play::{ChartUnit, CodeLabel, FieldZone, PlayEvent, PlayFamily, UNKNOWN_LABEL};
use crate::stack::effective_unit;

pub const ANY_DOWN: &str = "any down";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Situation {
    pub down: Option<i32>,
    pub distance: Option<i32>,
    pub field_zone: FieldZone,
}

impl Situation {
    pub fn of(e: &PlayEvent) -> Self {
        Self {
            down: e.down,
            distance: e.distance,
            field_zone: e.field_zone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TendencyGroup {
    pub key: String,
    pub sample_size: u32,
    pub success_rate: f64,
    pub explosive_rate: f64,
    pub average_yards: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TendencyReport {
    pub unit: String,
    pub bucket: String,
    pub field_zone: FieldZone,
    pub sample_size: u32,
    pub total_groups: usize,
    pub groups: Vec<TendencyGroup>,
    pub summary: String,
}

fn ordinal(down: i32) -> String {
    let suffix = match down {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    };
    format!("{down}{suffix}")
}

pub fn bucket_down_distance(down: Option<i32>, distance: Option<i32>) -> String {
    let (Some(down), Some(distance)) = (down, distance) else {
        return ANY_DOWN.to_string();
    };
    let length = if distance <= 2 {
        "short"
    } else if distance <= 6 {
        "medium"
    } else {
        "long"
    };
    format!("{length} {}", ordinal(down))
}

fn label(v: Option<&str>) -> &str {
    v.filter(|s| !s.trim().is_empty()).unwrap_or(UNKNOWN_LABEL)
}

fn group_key(e: &PlayEvent, unit: ChartUnit) -> String {
    match unit {
        ChartUnit::Offense => {
            let family = e
                .play_family
                .as_ref()
                .map(|f| f.as_str())
                .unwrap_or(UNKNOWN_LABEL);
            let concept = match e.family() {
                Some(PlayFamily::Run) => e.run_concept.as_deref(),
                Some(PlayFamily::Pass) => e.wr_concept_id.as_deref(),
                _ => None,
            }
            .or(e.play_call.as_deref());
            format!("{family} / {}", label(concept))
        }
        ChartUnit::Defense => {
            let shell = e
                .coverage_shell_pre
                .as_deref()
                .or(e.coverage_shell_post.as_deref());
            format!("{} / {}", label(shell), label(e.pressure_code.as_deref()))
        }
        ChartUnit::SpecialTeams => label(e.st_play_type.as_deref()).to_string(),
    }
}

#[derive(Default)]
struct Tally {
    plays: u32,
    eligible: u32,
    successes: u32,
    explosives: u32,
    yards: i64,
}

/// Rank what has worked for `unit` in the current down-and-distance bucket.
///
/// `events` are most-recent-first; without an explicit `current` situation the most recent
/// snap defines it.
pub fn tendency_lens(
    unit: ChartUnit,
    events: &[PlayEvent],
    current: Option<Situation>,
    top_n: usize,
) -> TendencyReport {
    let unit_events: Vec<&PlayEvent> = events.iter().filter(|e| effective_unit(e) == unit).collect();
    let current = current
        .or_else(|| unit_events.first().map(|e| Situation::of(e)))
        .unwrap_or(Situation {
            down: None,
            distance: None,
            field_zone: FieldZone::OpenField,
        });
    let bucket = bucket_down_distance(current.down, current.distance);

    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    let mut sample_size = 0u32;
    for e in unit_events {
        if bucket != ANY_DOWN && bucket_down_distance(e.down, e.distance) != bucket {
            continue;
        }
        sample_size += 1;
        let t = tallies.entry(group_key(e, unit)).or_default();
        t.plays += 1;
        t.yards += e.yards() as i64;
        if e.explosive {
            t.explosives += 1;
        }
        if let Some(ok) = play_success(e) {
            t.eligible += 1;
            if ok {
                t.successes += 1;
            }
        }
    }

    let mut groups: Vec<TendencyGroup> = tallies
        .into_iter()
        .filter(|(_, t)| t.plays > 0)
        .map(|(key, t)| TendencyGroup {
            key,
            sample_size: t.plays,
            success_rate: ratio(t.successes as f64, t.eligible as f64),
            explosive_rate: ratio(t.explosives as f64, t.plays as f64),
            average_yards: ratio(t.yards as f64, t.plays as f64),
        })
        .collect();
    groups.sort_by(|a, b| {
        b.success_rate
            .total_cmp(&a.success_rate)
            .then(b.sample_size.cmp(&a.sample_size))
            .then_with(|| a.key.cmp(&b.key))
    });
    let total_groups = groups.len();
    groups.truncate(top_n.max(1));

    let summary = summarize(unit, &bucket, current.field_zone, &groups);
    TendencyReport {
        unit: unit.code().to_string(),
        bucket,
        field_zone: current.field_zone,
        sample_size,
        total_groups,
        groups,
        summary,
    }
}

fn summarize(unit: ChartUnit, bucket: &str, zone: FieldZone, groups: &[TendencyGroup]) -> String {
    let unit_label = unit.code().to_ascii_lowercase().replace('_', " ");
    let Some(best) = groups.first() else {
        return format!("No {unit_label} snaps charted on {bucket} yet ({}).", zone.label());
    };
    let mut out = format!(
        "On {bucket} in the {}, {} has the best {unit_label} success rate at {:.0}% over {} play{}",
        zone.label(),
        best.key,
        best.success_rate * 100.0,
        best.sample_size,
        if best.sample_size == 1 { "" } else { "s" },
    );
    if let Some(next) = groups.get(1) {
        out.push_str(&format!(
            ", ahead of {} at {:.0}%",
            next.key,
            next.success_rate * 100.0
        ));
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{NormalizeDefaults, normalize_rows};
    use serde_json::json;

    fn events(rows: &[serde_json::Value]) -> Vec<PlayEvent> {
        normalize_rows(rows, &NormalizeDefaults::new("t", None))
    }

    #[test]
    fn buckets() {
        assert_eq!(bucket_down_distance(Some(3), Some(2)), "short 3rd");
        assert_eq!(bucket_down_distance(Some(2), Some(6)), "medium 2nd");
        assert_eq!(bucket_down_distance(Some(1), Some(10)), "long 1st");
        assert_eq!(bucket_down_distance(None, Some(10)), ANY_DOWN);
    }

    #[test]
    fn ranks_by_success_then_sample() {
        let evs = events(&[
            json!({"unit": "OFFENSE", "down": 3, "distance": 2, "ball_on": "D8", "play_family": "RUN",
                   "run_concept": "Inside Zone", "gained_yards": 1}),
            json!({"unit": "OFFENSE", "down": 3, "distance": 1, "play_family": "RUN",
                   "run_concept": "Power", "gained_yards": 2}),
            json!({"unit": "OFFENSE", "down": 3, "distance": 2, "play_family": "PASS",
                   "wr_concept_id": "Stick", "gained_yards": 5}),
            json!({"unit": "OFFENSE", "down": 3, "distance": 2, "play_family": "RUN",
                   "run_concept": "Power", "gained_yards": 3}),
            json!({"unit": "OFFENSE", "down": 3, "distance": 9, "play_family": "PASS",
                   "wr_concept_id": "Verts", "gained_yards": 30}),
            json!({"unit": "DEFENSE", "down": 3, "distance": 2, "coverage_shell_pre": "C3"}),
        ]);
        let report = tendency_lens(ChartUnit::Offense, &evs, None, 2);
        assert_eq!(report.bucket, "short 3rd");
        assert_eq!(report.field_zone, FieldZone::RedZone);
        assert_eq!(report.sample_size, 4);
        assert_eq!(report.total_groups, 3);
        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.groups[0].key, "RUN / Power");
        assert_eq!(report.groups[0].sample_size, 2);
        assert_eq!(report.groups[1].key, "PASS / Stick");
        assert!(report.summary.contains("red zone"));
        assert!(report.summary.contains("RUN / Power"));
    }

    #[test]
    fn unknown_categories_get_their_own_bucket() {
        let evs = events(&[
            json!({"unit": "DEFENSE", "down": 1, "distance": 10, "gained_yards": 2}),
            json!({"unit": "DEFENSE", "down": 1, "distance": 10, "coverage_shell_pre": "C1",
                   "pressure_code": "Fire Zone", "gained_yards": 8}),
        ]);
        let report = tendency_lens(ChartUnit::Defense, &evs, None, 5);
        let keys: Vec<&str> = report.groups.iter().map(|g| g.key.as_str()).collect();
        assert!(keys.contains(&"UNKNOWN / UNKNOWN"));
        assert!(keys.contains(&"C1 / Fire Zone"));
        let total: u32 = report.groups.iter().map(|g| g.sample_size).sum();
        assert_eq!(total, report.sample_size);
    }

    #[test]
    fn explicit_situation_overrides_latest_snap() {
        let evs = events(&[
            json!({"unit": "SPECIAL_TEAMS", "st_play_type": "PUNT", "gained_yards": 40}),
            json!({"unit": "SPECIAL_TEAMS", "st_play_type": "KICKOFF", "gained_yards": 20}),
        ]);
        let report = tendency_lens(
            ChartUnit::SpecialTeams,
            &evs,
            Some(Situation {
                down: None,
                distance: None,
                field_zone: FieldZone::BackedUp,
            }),
            3,
        );
        assert_eq!(report.bucket, ANY_DOWN);
        assert_eq!(report.sample_size, 2);
        assert!(report.summary.contains("backed up"));
    }

    #[test]
    fn empty_lens_has_no_best_option() {
        let report = tendency_lens(ChartUnit::Offense, &[], None, 3);
        assert!(report.groups.is_empty());
        assert_eq!(report.sample_size, 0);
        assert!(report.summary.starts_with("No offense snaps"));
    }

    #[test]
    fn uncharted_rows_follow_the_stack_unit_split() {
        use crate::stack::UnitScope;

        let evs = events(&[
            json!({"play_family": "RUN", "run_concept": "Power", "down": 1, "distance": 10, "gained_yards": 5}),
            json!({"down": 1, "distance": 10, "gained_yards": 3}),
            json!({"st_play_type": "PUNT", "gained_yards": 38}),
        ]);
        for unit in [ChartUnit::Offense, ChartUnit::Defense, ChartUnit::SpecialTeams] {
            let report = tendency_lens(unit, &evs, None, 5);
            let scoped = evs.iter().filter(|e| UnitScope::from(unit).includes(e)).count();
            assert_eq!(report.sample_size as usize, scoped, "{unit:?}");
        }
        assert_eq!(tendency_lens(ChartUnit::Offense, &evs, None, 5).sample_size, 2);
        assert_eq!(tendency_lens(ChartUnit::Defense, &evs, None, 5).sample_size, 0);
    }
}
