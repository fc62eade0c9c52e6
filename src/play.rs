use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const UNKNOWN_LABEL: &str = "UNKNOWN";

/// Closed vocabularies that travel as plain strings on the wire.
pub trait CodeLabel: Sized + Copy {
    fn code(self) -> &'static str;
    /// `raw` is already trimmed, upper-cased and has spaces/dashes folded to `_`.
    fn from_code(raw: &str) -> Option<Self>;
}

/// A known enumeration value, or whatever string upstream sent when it didn't match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Coded<T> {
    Known(T),
    Other(String),
}

impl<T: CodeLabel> Coded<T> {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let folded = trimmed.to_ascii_uppercase().replace([' ', '-'], "_");
        match T::from_code(&folded) {
            Some(v) => Coded::Known(v),
            None => Coded::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Coded::Known(v) => v.code(),
            Coded::Other(s) => s.as_str(),
        }
    }

    pub fn known(&self) -> Option<T> {
        match self {
            Coded::Known(v) => Some(*v),
            Coded::Other(_) => None,
        }
    }

    pub fn is(&self, want: T) -> bool
    where
        T: PartialEq,
    {
        self.known() == Some(want)
    }
}

impl<T: CodeLabel> fmt::Display for Coded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T: CodeLabel> Serialize for Coded<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de, T: CodeLabel> Deserialize<'de> for Coded<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Coded::parse(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartUnit {
    Offense,
    Defense,
    SpecialTeams,
}

impl CodeLabel for ChartUnit {
    fn code(self) -> &'static str {
        match self {
            ChartUnit::Offense => "OFFENSE",
            ChartUnit::Defense => "DEFENSE",
            ChartUnit::SpecialTeams => "SPECIAL_TEAMS",
        }
    }

    fn from_code(raw: &str) -> Option<Self> {
        match raw {
            "OFFENSE" | "O" | "OFF" => Some(ChartUnit::Offense),
            "DEFENSE" | "D" | "DEF" => Some(ChartUnit::Defense),
            "SPECIAL_TEAMS" | "ST" | "SPECIAL" => Some(ChartUnit::SpecialTeams),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayFamily {
    Run,
    Pass,
    SpecialTeams,
}

impl CodeLabel for PlayFamily {
    fn code(self) -> &'static str {
        match self {
            PlayFamily::Run => "RUN",
            PlayFamily::Pass => "PASS",
            PlayFamily::SpecialTeams => "SPECIAL_TEAMS",
        }
    }

    fn from_code(raw: &str) -> Option<Self> {
        match raw {
            "RUN" | "RUSH" => Some(PlayFamily::Run),
            "PASS" => Some(PlayFamily::Pass),
            "SPECIAL_TEAMS" | "ST" => Some(PlayFamily::SpecialTeams),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveResult {
    Touchdown,
    FieldGoal,
    MissedFieldGoal,
    Punt,
    Downs,
    Turnover,
    Safety,
    EndOfHalf,
}

impl CodeLabel for DriveResult {
    fn code(self) -> &'static str {
        match self {
            DriveResult::Touchdown => "TD",
            DriveResult::FieldGoal => "FG",
            DriveResult::MissedFieldGoal => "MISSED_FG",
            DriveResult::Punt => "PUNT",
            DriveResult::Downs => "DOWNS",
            DriveResult::Turnover => "TURNOVER",
            DriveResult::Safety => "SAFETY",
            DriveResult::EndOfHalf => "END_OF_HALF",
        }
    }

    fn from_code(raw: &str) -> Option<Self> {
        match raw {
            "TD" | "TOUCHDOWN" => Some(DriveResult::Touchdown),
            "FG" | "FIELD_GOAL" => Some(DriveResult::FieldGoal),
            "MISSED_FG" | "MISSED_FIELD_GOAL" => Some(DriveResult::MissedFieldGoal),
            "PUNT" => Some(DriveResult::Punt),
            "DOWNS" | "TURNOVER_ON_DOWNS" => Some(DriveResult::Downs),
            "TURNOVER" | "INT" | "FUMBLE" => Some(DriveResult::Turnover),
            "SAFETY" => Some(DriveResult::Safety),
            "END_OF_HALF" | "END_HALF" | "END_OF_GAME" => Some(DriveResult::EndOfHalf),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    Scheduled,
    InProgress,
    Final,
}

impl CodeLabel for GameStatus {
    fn code(self) -> &'static str {
        match self {
            GameStatus::Scheduled => "SCHEDULED",
            GameStatus::InProgress => "IN_PROGRESS",
            GameStatus::Final => "FINAL",
        }
    }

    fn from_code(raw: &str) -> Option<Self> {
        match raw {
            "SCHEDULED" | "UPCOMING" => Some(GameStatus::Scheduled),
            "IN_PROGRESS" | "LIVE" => Some(GameStatus::InProgress),
            "FINAL" | "COMPLETED" | "COMPLETE" => Some(GameStatus::Final),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldZone {
    BackedUp,
    ComingOut,
    OpenField,
    ScoringRange,
    RedZone,
}

impl FieldZone {
    /// Yard line runs 0 (own goal line) to 100 (opponent goal line).
    pub fn from_yard_line(yard_line: i32) -> Self {
        if yard_line <= 10 {
            FieldZone::BackedUp
        } else if yard_line <= 25 {
            FieldZone::ComingOut
        } else if yard_line <= 75 {
            FieldZone::OpenField
        } else if yard_line <= 90 {
            FieldZone::ScoringRange
        } else {
            FieldZone::RedZone
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldZone::BackedUp => "backed up",
            FieldZone::ComingOut => "coming out",
            FieldZone::OpenField => "open field",
            FieldZone::ScoringRange => "scoring range",
            FieldZone::RedZone => "red zone",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Penalty {
    pub occurred: bool,
    pub yards: i32,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub id: String,
    pub team_id: String,
    pub game_id: String,
    pub game_session_id: Option<String>,
    pub opponent_name: Option<String>,

    pub quarter: Option<i32>,
    pub clock_seconds: Option<i32>,
    pub absolute_clock_seconds: Option<i32>,
    pub down: Option<i32>,
    pub distance: Option<i32>,
    pub ball_on: Option<String>,
    pub field_position: i32,
    pub field_zone: FieldZone,
    pub unit: Option<Coded<ChartUnit>>,

    pub gained_yards: Option<i32>,
    pub result: Option<String>,
    pub explosive: bool,
    pub turnover: bool,
    pub turnover_detail_type: Option<String>,
    pub first_down: bool,
    pub scoring: bool,
    pub score_for: Option<i32>,
    pub score_against: Option<i32>,

    pub play_family: Option<Coded<PlayFamily>>,
    pub run_concept: Option<String>,
    pub wr_concept_id: Option<String>,
    pub play_call: Option<String>,
    pub coverage_shell_pre: Option<String>,
    pub coverage_shell_post: Option<String>,
    pub pressure_code: Option<String>,
    pub st_play_type: Option<String>,
    pub motion: bool,
    pub shift: bool,
    pub play_action: bool,
    pub shot: bool,
    pub player_ids: Vec<String>,

    pub drive_number: Option<i32>,
    pub sequence: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub penalties: Vec<Penalty>,
}

impl PlayEvent {
    pub fn family(&self) -> Option<PlayFamily> {
        self.play_family.as_ref().and_then(Coded::known)
    }

    pub fn chart_unit(&self) -> Option<ChartUnit> {
        self.unit.as_ref().and_then(Coded::known)
    }

    pub fn yards(&self) -> i32 {
        self.gained_yards.unwrap_or(0)
    }

    pub fn result_lower(&self) -> String {
        self.result
            .as_deref()
            .map(|r| r.trim().to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Game-clock ordering; events without a clock sort by sequence after clocked ones.
    pub fn clock_order(&self, other: &PlayEvent) -> Ordering {
        match (self.absolute_clock_seconds, other.absolute_clock_seconds) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then(self.sequence.unwrap_or(0).cmp(&other.sequence.unwrap_or(0)))
        .then_with(|| self.id.cmp(&other.id))
    }
}

/// Sorted copy in game-clock order.
pub fn in_clock_order(events: &[PlayEvent]) -> Vec<&PlayEvent> {
    let mut out: Vec<&PlayEvent> = events.iter().collect();
    out.sort_by(|a, b| a.clock_order(b));
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMeta {
    pub id: String,
    #[serde(default, alias = "opponent")]
    pub opponent_name: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub season_label: Option<String>,
    #[serde(default)]
    pub status: Option<Coded<GameStatus>>,
    #[serde(default)]
    pub conference_game: Option<bool>,
}

impl GameMeta {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            opponent_name: None,
            start_time: None,
            season_label: None,
            status: None,
            conference_game: None,
        }
    }

    pub fn is_final(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.is(GameStatus::Final))
    }

    pub fn is_scheduled(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.is(GameStatus::Scheduled))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsPreferences {
    #[serde(default = "default_explosive_run", alias = "explosiveRun")]
    pub explosive_run: i32,
    #[serde(default = "default_explosive_pass", alias = "explosivePass")]
    pub explosive_pass: i32,
    #[serde(default = "default_true", alias = "includeTurnoverOnDowns")]
    pub include_turnover_on_downs: bool,
}

impl Default for AnalyticsPreferences {
    fn default() -> Self {
        Self {
            explosive_run: default_explosive_run(),
            explosive_pass: default_explosive_pass(),
            include_turnover_on_downs: true,
        }
    }
}

fn default_explosive_run() -> i32 {
    12
}

fn default_explosive_pass() -> i32 {
    15
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_zone_boundaries_are_exact() {
        let cases = [
            (10, FieldZone::BackedUp),
            (11, FieldZone::ComingOut),
            (25, FieldZone::ComingOut),
            (26, FieldZone::OpenField),
            (75, FieldZone::OpenField),
            (76, FieldZone::ScoringRange),
            (90, FieldZone::ScoringRange),
            (91, FieldZone::RedZone),
        ];
        for (yl, zone) in cases {
            assert_eq!(FieldZone::from_yard_line(yl), zone, "yard line {yl}");
        }
    }

    #[test]
    fn coded_keeps_unknown_strings() {
        let unit: Coded<ChartUnit> = Coded::parse("special teams");
        assert_eq!(unit, Coded::Known(ChartUnit::SpecialTeams));
        let other: Coded<ChartUnit> = Coded::parse(" Opponent ");
        assert_eq!(other, Coded::Other("Opponent".to_string()));
        assert_eq!(other.as_str(), "Opponent");
    }

    #[test]
    fn coded_serializes_as_plain_string() {
        let family: Coded<PlayFamily> = Coded::Known(PlayFamily::Pass);
        assert_eq!(serde_json::to_string(&family).unwrap(), "\"PASS\"");
        let back: Coded<DriveResult> = serde_json::from_str("\"touchdown\"").unwrap();
        assert_eq!(back, Coded::Known(DriveResult::Touchdown));
    }
}
