use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::box_score::play_success;
use crate::play::{Coded, DriveResult, PlayEvent, UNKNOWN_LABEL, in_clock_order};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePair {
    pub team: i32,
    pub opponent: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveRecord {
    pub drive_number: i32,
    pub play_ids: Vec<String>,
    pub start_field_position: i32,
    pub end_field_position: i32,
    pub start_score: Option<ScorePair>,
    pub end_score: Option<ScorePair>,
    pub yards: i32,
    pub result: Coded<DriveResult>,
}

impl DriveRecord {
    pub fn plays(&self) -> usize {
        self.play_ids.len()
    }

    pub fn scored(&self) -> bool {
        matches!(
            self.result.known(),
            Some(DriveResult::Touchdown | DriveResult::FieldGoal)
        )
    }
}

/// Group plays by drive number. Plays without a drive number are not part of any drive.
pub fn build_drives(events: &[PlayEvent]) -> Vec<DriveRecord> {
    let mut grouped: BTreeMap<i32, Vec<&PlayEvent>> = BTreeMap::new();
    for e in in_clock_order(events) {
        if let Some(d) = e.drive_number {
            grouped.entry(d).or_default().push(e);
        }
    }

    grouped
        .into_iter()
        .filter_map(|(drive_number, plays)| {
            let first = plays.first()?;
            let last = plays.last()?;
            Some(DriveRecord {
                drive_number,
                play_ids: plays.iter().map(|p| p.id.clone()).collect(),
                start_field_position: first.field_position,
                end_field_position: last.field_position.saturating_add(last.yards()).clamp(0, 100),
                start_score: score_of(first),
                end_score: plays.iter().rev().find_map(|p| score_of(p)),
                yards: plays.iter().fold(0i32, |acc, p| acc.saturating_add(p.yards())),
                result: classify_drive_result(last),
            })
        })
        .collect()
}

fn score_of(e: &PlayEvent) -> Option<ScorePair> {
    Some(ScorePair {
        team: e.score_for?,
        opponent: e.score_against?,
    })
}

/// Terminal classification from a drive's final snap.
pub fn classify_drive_result(last: &PlayEvent) -> Coded<DriveResult> {
    let r = last.result_lower();
    let says = |needle: &str| r.contains(needle);

    if says("safety") {
        return Coded::Known(DriveResult::Safety);
    }
    if says("fg") || says("field goal") {
        if says("miss") || says("no good") || says("blocked") {
            return Coded::Known(DriveResult::MissedFieldGoal);
        }
        return Coded::Known(DriveResult::FieldGoal);
    }
    if says("td") || says("touchdown") || (last.scoring && r.is_empty()) {
        return Coded::Known(DriveResult::Touchdown);
    }
    if last.turnover {
        if last.turnover_detail_type.as_deref() == Some("DOWNS") {
            return Coded::Known(DriveResult::Downs);
        }
        return Coded::Known(DriveResult::Turnover);
    }
    if last
        .st_play_type
        .as_deref()
        .is_some_and(|t| t.to_ascii_uppercase().contains("PUNT"))
        || says("punt")
    {
        return Coded::Known(DriveResult::Punt);
    }
    if last.down == Some(4) && play_success(last) == Some(false) && !last.first_down {
        return Coded::Known(DriveResult::Downs);
    }
    match last.result.as_deref() {
        Some(raw) => Coded::parse(raw),
        None => Coded::Other(UNKNOWN_LABEL.to_string()),
    }
}
