use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::box_score::{ExplosiveThresholds, classify_explosive};
use crate::play::{
    AnalyticsPreferences, ChartUnit, Coded, FieldZone, GameMeta, Penalty, PlayEvent, PlayFamily,
};

const MIDFIELD: i32 = 50;
const QUARTER_SECONDS: i32 = 900;

// Plausible football ranges; anything outside is clamped at the boundary.
const MAX_QUARTER: i32 = 8;
const MAX_DOWN: i32 = 4;
const MAX_DISTANCE: i32 = 100;
const MAX_GAIN: i32 = 100;
const MAX_SCORE: i32 = 999;
const MAX_DRIVE: i32 = 999;

#[derive(Debug, Clone, Default)]
pub struct NormalizeDefaults {
    pub team_id: String,
    pub opponent: Option<String>,
}

impl NormalizeDefaults {
    pub fn new(team_id: impl Into<String>, opponent: Option<&str>) -> Self {
        Self {
            team_id: team_id.into(),
            opponent: opponent.map(str::to_string),
        }
    }
}

/// Parse a JSON array of raw rows. `null` and empty documents yield no rows.
pub fn parse_rows_json(raw: &str) -> Result<Vec<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid play rows json")?;
    match v {
        Value::Array(rows) => Ok(rows),
        Value::Object(ref map) => {
            // Some exports wrap the rows: { "plays": [...] }.
            let rows = map
                .get("plays")
                .or_else(|| map.get("rows"))
                .and_then(|x| x.as_array())
                .cloned()
                .context("play rows json has no plays array")?;
            Ok(rows)
        }
        _ => Err(anyhow::anyhow!("play rows json must be an array")),
    }
}

pub fn normalize_rows(rows: &[Value], defaults: &NormalizeDefaults) -> Vec<PlayEvent> {
    rows.iter().map(|row| normalize_row(row, defaults)).collect()
}

pub fn normalize_row(row: &Value, defaults: &NormalizeDefaults) -> PlayEvent {
    let ball_on = get_str(row, &["ball_on"]);
    let field_position = get_bounded(row, &["field_position"], 0, 100)
        .unwrap_or_else(|| yard_line_from_ball_on(ball_on.as_deref()));

    let quarter = get_bounded(row, &["quarter"], 1, MAX_QUARTER);
    let clock_seconds = get_clock(row);

    let st_play_type = get_str(row, &["st_play_type"]);
    let play_family = get_str(row, &["play_family"])
        .map(|raw| Coded::<PlayFamily>::parse(&raw))
        .or_else(|| {
            st_play_type
                .as_ref()
                .map(|_| Coded::Known(PlayFamily::SpecialTeams))
        });

    let gained_yards = get_bounded(row, &["gained_yards"], -MAX_GAIN, MAX_GAIN);
    let family = play_family.as_ref().and_then(Coded::known);
    let explosive = get_bool(row, &["explosive"]).unwrap_or_else(|| {
        classify_explosive(gained_yards, family, &ExplosiveThresholds::default())
    });

    let turnover_detail_type = row
        .get("turnover_detail")
        .and_then(|d| get_str(d, &["type"]))
        .or_else(|| get_str(row, &["turnover_detail_type", "turnover_type"]))
        .map(|s| s.to_ascii_uppercase());

    let sequence = get_i64(row, &["sequence"]);
    let game_id = get_str(row, &["game_id"]).unwrap_or_default();
    let id = get_str(row, &["id"]).unwrap_or_else(|| match sequence {
        Some(seq) => format!("{game_id}#{seq}"),
        None => String::new(),
    });

    PlayEvent {
        id,
        team_id: get_str(row, &["team_id"]).unwrap_or_else(|| defaults.team_id.clone()),
        game_id,
        game_session_id: get_str(row, &["game_session_id"]),
        opponent_name: get_str(row, &["opponent_name", "opponent"])
            .or_else(|| defaults.opponent.clone()),
        quarter,
        clock_seconds,
        absolute_clock_seconds: absolute_clock_seconds(quarter, clock_seconds),
        down: get_bounded(row, &["down"], 1, MAX_DOWN),
        distance: get_bounded(row, &["distance"], 0, MAX_DISTANCE),
        ball_on,
        field_position,
        field_zone: FieldZone::from_yard_line(field_position),
        unit: get_str(row, &["unit", "possession"]).map(|raw| Coded::<ChartUnit>::parse(&raw)),
        gained_yards,
        result: get_str(row, &["result"]),
        explosive,
        turnover: get_bool(row, &["turnover"]).unwrap_or(false),
        turnover_detail_type,
        first_down: get_bool(row, &["first_down"]).unwrap_or(false),
        scoring: get_bool(row, &["scoring"]).unwrap_or(false),
        score_for: get_bounded(row, &["score_for", "team_score"], 0, MAX_SCORE),
        score_against: get_bounded(row, &["score_against", "opponent_score"], 0, MAX_SCORE),
        play_family,
        run_concept: get_str(row, &["run_concept"]),
        wr_concept_id: get_str(row, &["wr_concept_id"]),
        play_call: get_str(row, &["play_call"]),
        coverage_shell_pre: get_str(row, &["coverage_shell_pre"]),
        coverage_shell_post: get_str(row, &["coverage_shell_post"]),
        pressure_code: get_str(row, &["pressure_code"]),
        st_play_type,
        motion: get_bool(row, &["motion", "has_motion"]).unwrap_or(false),
        shift: get_bool(row, &["shift", "has_shift"]).unwrap_or(false),
        play_action: get_bool(row, &["play_action", "is_play_action"]).unwrap_or(false),
        shot: get_bool(row, &["shot", "is_shot_play"]).unwrap_or(false),
        player_ids: get_player_ids(row),
        drive_number: get_bounded(row, &["drive_number"], 0, MAX_DRIVE),
        sequence,
        created_at: get_timestamp(row, &["created_at"]),
        penalties: get_penalties(row),
    }
}

/// `O<n>` is own territory, `D<n>`/`X<n>` is the opponent's. Anything else is midfield.
pub fn yard_line_from_ball_on(raw: Option<&str>) -> i32 {
    let Some(raw) = raw else {
        return MIDFIELD;
    };
    let s = raw.trim();
    let mut chars = s.chars();
    let Some(side) = chars.next() else {
        return MIDFIELD;
    };
    let Ok(n) = chars.as_str().trim().parse::<i64>() else {
        return MIDFIELD;
    };
    let Ok(n) = i32::try_from(n.clamp(0, 100)) else {
        return MIDFIELD;
    };
    let yard_line = match side.to_ascii_uppercase() {
        'O' => n,
        'D' | 'X' => 100 - n,
        _ => return MIDFIELD,
    };
    yard_line.clamp(0, 100)
}

pub fn absolute_clock_seconds(quarter: Option<i32>, clock_seconds: Option<i32>) -> Option<i32> {
    let (q, c) = (quarter?, clock_seconds?);
    let elapsed_in_quarter = QUARTER_SECONDS - c.clamp(0, QUARTER_SECONDS);
    Some(
        q.clamp(1, MAX_QUARTER)
            .saturating_sub(1)
            .saturating_mul(QUARTER_SECONDS)
            .saturating_add(elapsed_in_quarter),
    )
}

/// Re-derive explosive flags with team thresholds and optionally drop turnover-on-downs.
pub fn apply_preferences(events: &[PlayEvent], prefs: &AnalyticsPreferences) -> Vec<PlayEvent> {
    let thresholds = ExplosiveThresholds::from_preferences(prefs);
    events
        .iter()
        .map(|e| {
            let mut out = e.clone();
            out.explosive = classify_explosive(e.gained_yards, e.family(), &thresholds);
            if !prefs.include_turnover_on_downs
                && e.turnover_detail_type.as_deref() == Some("DOWNS")
            {
                out.turnover = false;
            }
            out
        })
        .collect()
}

/// Schedule rows; rows without an id are skipped.
pub fn normalize_game(row: &Value) -> Option<GameMeta> {
    let id = get_str(row, &["id", "game_id"])?;
    Some(GameMeta {
        id,
        opponent_name: get_str(row, &["opponent_name", "opponent"]),
        start_time: get_timestamp(row, &["start_time", "kickoff"]),
        season_label: get_str(row, &["season_label", "season"]),
        status: get_str(row, &["status"]).map(|s| Coded::parse(&s)),
        conference_game: get_bool(row, &["conference_game", "is_conference"]),
    })
}

pub fn parse_games_json(raw: &str) -> Result<Vec<GameMeta>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid games json")?;
    let rows = match v {
        Value::Array(rows) => rows,
        Value::Object(map) => map
            .get("games")
            .and_then(|x| x.as_array())
            .cloned()
            .context("games json has no games array")?,
        _ => return Err(anyhow::anyhow!("games json must be an array")),
    };
    Ok(rows.iter().filter_map(normalize_game).collect())
}

fn get_str(row: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        let s = match row.get(*key) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => continue,
        };
        if !s.is_empty() {
            return Some(s);
        }
    }
    None
}

fn get_i64(row: &Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        let v = match row.get(*key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
            Some(Value::String(s)) => parse_number_cell(s),
            _ => None,
        };
        if v.is_some() {
            return v;
        }
    }
    None
}

fn get_bounded(row: &Value, keys: &[&str], lo: i32, hi: i32) -> Option<i32> {
    get_i64(row, keys).and_then(|v| i32::try_from(v.clamp(i64::from(lo), i64::from(hi))).ok())
}

fn get_bool(row: &Value, keys: &[&str]) -> Option<bool> {
    for key in keys {
        let v = match row.get(*key) {
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::Number(n)) => n.as_i64().map(|v| v != 0),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(true),
                "false" | "f" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        };
        if v.is_some() {
            return v;
        }
    }
    None
}

fn parse_number_cell(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.round() as i64)
}

/// Clock remaining in the quarter; accepts seconds or "MM:SS".
fn get_clock(row: &Value) -> Option<i32> {
    if let Some(v) = get_bounded(row, &["clock_seconds"], 0, QUARTER_SECONDS) {
        return Some(v);
    }
    let raw = get_str(row, &["clock_seconds", "clock"])?;
    let (m, s) = raw.split_once(':')?;
    let m = m.trim().parse::<i64>().ok()?;
    let s = s.trim().parse::<i64>().ok()?;
    let total = m.checked_mul(60)?.checked_add(s)?;
    i32::try_from(total.clamp(0, i64::from(QUARTER_SECONDS))).ok()
}

fn get_timestamp(row: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    for key in keys {
        let ts = match row.get(*key) {
            Some(Value::String(s)) => parse_timestamp(s),
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            _ => None,
        };
        if ts.is_some() {
            return ts;
        }
    }
    None
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

fn get_penalties(row: &Value) -> Vec<Penalty> {
    let Some(arr) = row.get("penalties").and_then(|x| x.as_array()) else {
        return Vec::new();
    };
    arr.iter()
        .filter(|p| p.is_object())
        .map(|p| Penalty {
            occurred: get_bool(p, &["occurred"]).unwrap_or(false),
            yards: get_bounded(p, &["yards"], -MAX_GAIN, MAX_GAIN).unwrap_or(0),
            code: get_str(p, &["code", "type"]),
        })
        .collect()
}

fn get_player_ids(row: &Value) -> Vec<String> {
    if let Some(arr) = row.get("player_ids").and_then(|x| x.as_array()) {
        return arr
            .iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect();
    }
    get_str(row, &["primary_player_id"]).into_iter().collect()
}
