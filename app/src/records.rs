//! Record types written to the tracker collections.
//!
//! Records are written through these types and read back as loose
//! [`Entry`] maps, since older documents may carry extra or missing fields.

use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime};
use gymlog_store::Entry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Timestamp format for `date` fields.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Upper bound accepted for a logged weight, in kilograms.
pub const MAX_WEIGHT_KG: f64 = 1000.0;

/// Upper bound accepted for logged reps.
pub const MAX_REPS: u32 = 1000;

/// Weight logs considered by the weekly progress summary.
pub const PROGRESS_WINDOW: usize = 50;

/// An exercise in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: u64,
    pub name: String,
    pub category: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// One weight/rep log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightLog {
    pub id: u64,
    pub exercise_id: u64,
    pub weight: f64,
    pub reps: u32,
    pub date: String,
    pub notes: String,
}

/// A completed workout session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: u64,
    pub name: String,
    pub date: String,
    pub exercises: Vec<Entry>,
}

/// A point in an exercise's weight progression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPoint {
    pub weight: Value,
    pub date: Option<String>,
}

/// Summary of the past seven days, appended to `reports`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub week_start: String,
    pub week_end: String,
    pub total_sessions: usize,
    pub total_exercises: usize,
    pub sessions: Vec<Entry>,
    /// Keyed by exercise id
    pub progress_summary: BTreeMap<String, Vec<ProgressPoint>>,
}

type CatalogRow = (
    &'static str,
    &'static str,
    &'static str,
    Option<u32>,
    u32,
    Option<&'static str>,
);

const DEFAULT_CATALOG: [CatalogRow; 26] = [
    // Strength
    ("Back squat", "Legs", "Primary compound leg exercise", Some(3), 12, None),
    ("Bridge", "Glutes", "Hip bridge for glute activation", Some(3), 15, None),
    ("Bench press", "Chest", "Primary chest compound exercise", Some(3), 10, None),
    ("Bench superman", "Back", "Core and back stability", Some(3), 12, None),
    ("Bentover Row", "Back", "Upper back strength", Some(3), 12, None),
    ("Pallof Twist", "Core", "Anti-rotation core exercise", Some(3), 10, None),
    ("Shoulder press", "Shoulders", "Overhead pressing movement", Some(3), 10, None),
    ("Knee Tucks", "Core", "Core strengthening", Some(3), 15, None),
    ("Plank", "Core", "Isometric core exercise", Some(3), 45, Some("seconds")),
    ("Incline Bench Press", "Chest", "Upper chest development", Some(3), 10, None),
    ("Pallof Press", "Core", "Anti-extension core exercise", Some(3), 12, None),
    ("Lat Pull Downs", "Back", "Latissimus dorsi development", Some(3), 12, None),
    ("Landmines", "Full Body", "Functional movement pattern", Some(3), 10, None),
    ("Upright row", "Shoulders", "Shoulder and trap development", Some(3), 12, None),
    // Warmups
    ("Arm Circles", "Warmup-Dynamic", "Shoulder mobility", None, 10, Some("each direction")),
    ("Leg Swings", "Warmup-Dynamic", "Hip mobility", None, 10, Some("each leg")),
    ("Torso Twists", "Warmup-Dynamic", "Spine mobility", None, 10, Some("each side")),
    ("High Knees", "Warmup-Dynamic", "Dynamic warm-up", None, 30, Some("seconds")),
    ("Single Leg Balance", "Warmup-Stability", "Balance training", None, 30, Some("seconds each leg")),
    ("Bird Dog", "Warmup-Stability", "Core stability", None, 10, Some("each side")),
    ("Wall Sits", "Warmup-Stability", "Isometric strength", None, 30, Some("seconds")),
    ("Glute Bridges", "Warmup-Stability", "Glute activation", None, 15, None),
    ("Bodyweight Squats", "Warmup-Movement", "Movement pattern", None, 10, None),
    ("Push-up to Downward Dog", "Warmup-Movement", "Full body movement", None, 8, None),
    ("Lunge with Rotation", "Warmup-Movement", "Multi-planar movement", None, 8, Some("each side")),
    ("Cat-Cow Stretch", "Warmup-Movement", "Spinal mobility", None, 10, None),
];

const SESSION_1: [&str; 8] = [
    "Back squat",
    "Bridge",
    "Bench press",
    "Bench superman",
    "Bentover Row",
    "Pallof Twist",
    "Shoulder press",
    "Knee Tucks",
];

const SESSION_2: [&str; 6] = [
    "Plank",
    "Incline Bench Press",
    "Pallof Press",
    "Lat Pull Downs",
    "Landmines",
    "Upright row",
];

/// Predefined workouts drawn from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SessionPreset {
    #[value(name = "session1")]
    Session1,
    #[value(name = "session2")]
    Session2,
    WarmupDynamic,
    WarmupStability,
    WarmupMovement,
}

impl SessionPreset {
    /// Name used for logged sessions, e.g. `Warmup-Dynamic - 2026-10-19`.
    pub fn title(self) -> &'static str {
        match self {
            Self::Session1 => "Session1",
            Self::Session2 => "Session2",
            Self::WarmupDynamic => "Warmup-Dynamic",
            Self::WarmupStability => "Warmup-Stability",
            Self::WarmupMovement => "Warmup-Movement",
        }
    }

    /// Whether `exercise` belongs to this preset. Strength sessions match
    /// by exercise name, warmups by category.
    pub fn includes(self, exercise: &Entry) -> bool {
        let names: &[&str] = match self {
            Self::Session1 => &SESSION_1,
            Self::Session2 => &SESSION_2,
            Self::WarmupDynamic | Self::WarmupStability | Self::WarmupMovement => {
                return field_str(exercise, "category") == Some(self.title());
            }
        };
        field_str(exercise, "name").is_some_and(|name| names.contains(&name))
    }
}

/// The catalog seeded on first run, with ids 1 to 26.
pub fn default_exercises() -> Vec<Exercise> {
    DEFAULT_CATALOG
        .iter()
        .zip(1..)
        .map(|(&(name, category, description, sets, reps, unit), id)| Exercise {
            id,
            name: name.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            sets,
            reps: Some(reps),
            unit: unit.map(str::to_string),
        })
        .collect()
}

/// Convert a record into a collection entry.
pub fn to_entry<T: Serialize>(record: &T) -> Result<Entry> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(crate::AppError::BadRequest(format!(
            "record serialized to {} instead of an object",
            other
        ))),
    }
}

pub fn field_u64(entry: &Entry, key: &str) -> Option<u64> {
    entry.get(key).and_then(Value::as_u64)
}

pub fn field_f64(entry: &Entry, key: &str) -> Option<f64> {
    entry.get(key).and_then(Value::as_f64)
}

pub fn field_str<'a>(entry: &'a Entry, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str)
}

/// Next id for `entries`: one past the largest `id`, or 1.
pub fn next_id(entries: &[Entry]) -> u64 {
    entries
        .iter()
        .filter_map(|e| field_u64(e, "id"))
        .max()
        .map_or(1, |id| id + 1)
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a `date` field. Accepts full timestamps and bare dates.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    text.parse::<NaiveDateTime>().ok().or_else(|| {
        text.parse::<NaiveDate>()
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

/// Calendar day of an entry's `date` field.
pub fn entry_day(entry: &Entry) -> Option<NaiveDate> {
    field_str(entry, "date")
        .and_then(parse_timestamp)
        .map(|at| at.date())
}
