//! Tracker - the workout operations the UI performs, on top of
//! [`DataStorage`].
//!
//! Every load and save goes through [`DataStorage::with_retry`] so transient
//! I/O failures are retried and show up in the performance summary under the
//! tracker's operation names.

use crate::analytics::{self, Insights};
use crate::error::{AppError, Result};
use crate::records::{
    default_exercises, entry_day, field_str, field_u64, format_timestamp, next_id,
    parse_timestamp, to_entry, Exercise, ProgressPoint, Session, SessionPreset, WeeklyReport,
    WeightLog, MAX_REPS, MAX_WEIGHT_KG, PROGRESS_WINDOW,
};
use chrono::{Duration, Local, NaiveDateTime};
use gymlog_store::collections::{ALL, EXERCISES, REPORTS, SESSIONS, WEIGHTS};
use gymlog_store::{DataStorage, Entry, HealthReport};
use serde_json::Value;
use std::collections::BTreeMap;

/// Days covered by a weekly report.
const REPORT_WEEK_DAYS: i64 = 7;

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Workout tracker backed by one storage directory.
#[derive(Debug)]
pub struct Tracker {
    storage: DataStorage,
}

impl Tracker {
    /// Seed missing collections, then verify every collection and restore
    /// the ones that fail.
    pub fn open(mut storage: DataStorage) -> Result<Self> {
        if !storage.document_path(EXERCISES)?.exists() {
            let catalog = default_exercises()
                .iter()
                .map(to_entry)
                .collect::<Result<Vec<_>>>()?;
            storage.with_retry("save_exercises", |s| s.save(EXERCISES, &catalog))?;
            tracing::info!("Seeded default exercise catalog");
        }
        for collection in [SESSIONS, WEIGHTS, REPORTS] {
            if !storage.document_path(collection)?.exists() {
                storage.with_retry(&format!("save_{}", collection), |s| {
                    s.save(collection, &[])
                })?;
            }
        }

        let restored = storage.verify_all(&ALL);
        if !restored.is_empty() {
            tracing::warn!("Restored from backup on startup: {}", restored.join(", "));
        }

        Ok(Self { storage })
    }

    pub fn storage(&self) -> &DataStorage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut DataStorage {
        &mut self.storage
    }

    fn load(&mut self, collection: &str) -> Result<Vec<Entry>> {
        let operation = format!("load_{}", collection);
        Ok(self.storage.with_retry(&operation, |s| s.load(collection))?)
    }

    fn save(&mut self, collection: &str, entries: &[Entry]) -> Result<()> {
        let operation = format!("save_{}", collection);
        Ok(self
            .storage
            .with_retry(&operation, |s| s.save(collection, entries))?)
    }

    /// The exercise catalog, optionally restricted to one category.
    pub fn exercises(&mut self, category: Option<&str>) -> Result<Vec<Entry>> {
        let mut exercises = self.load(EXERCISES)?;
        if let Some(category) = category {
            exercises.retain(|e| {
                field_str(e, "category").is_some_and(|c| c.eq_ignore_ascii_case(category))
            });
        }
        Ok(exercises)
    }

    /// Look up an exercise by id.
    pub fn exercise(&mut self, id: u64) -> Result<Entry> {
        self.load(EXERCISES)?
            .into_iter()
            .find(|e| field_u64(e, "id") == Some(id))
            .ok_or_else(|| AppError::NotFound(format!("No exercise with id {}", id)))
    }

    /// Catalog exercises of a predefined session, in catalog order.
    pub fn session_exercises(&mut self, preset: SessionPreset) -> Result<Vec<Entry>> {
        let mut exercises = self.load(EXERCISES)?;
        exercises.retain(|e| preset.includes(e));
        Ok(exercises)
    }

    /// Add an exercise to the catalog with the next free id.
    pub fn add_exercise(&mut self, name: &str, category: &str, description: &str) -> Result<Entry> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest(
                "Exercise name must not be empty".to_string(),
            ));
        }

        let mut exercises = self.load(EXERCISES)?;
        let entry = to_entry(&Exercise {
            id: next_id(&exercises),
            name: name.to_string(),
            category: category.trim().to_string(),
            description: description.to_string(),
            sets: None,
            reps: None,
            unit: None,
        })?;

        exercises.push(entry.clone());
        self.save(EXERCISES, &exercises)?;
        tracing::info!("Added exercise {}", name);
        Ok(entry)
    }

    /// Record a weight/rep log for an existing exercise.
    pub fn log_weight(
        &mut self,
        exercise_id: u64,
        weight: f64,
        reps: u32,
        notes: &str,
    ) -> Result<Entry> {
        self.log_weight_at(exercise_id, weight, reps, notes, now())
    }

    pub fn log_weight_at(
        &mut self,
        exercise_id: u64,
        weight: f64,
        reps: u32,
        notes: &str,
        at: NaiveDateTime,
    ) -> Result<Entry> {
        if !weight.is_finite() || !(0.0..=MAX_WEIGHT_KG).contains(&weight) {
            return Err(AppError::BadRequest(format!(
                "Weight must be between 0 and {} kg",
                MAX_WEIGHT_KG
            )));
        }
        if reps > MAX_REPS {
            return Err(AppError::BadRequest(format!(
                "Reps must be between 0 and {}",
                MAX_REPS
            )));
        }
        self.exercise(exercise_id)?;

        let mut weights = self.load(WEIGHTS)?;
        let entry = to_entry(&WeightLog {
            id: next_id(&weights),
            exercise_id,
            weight,
            reps,
            date: format_timestamp(at),
            notes: notes.to_string(),
        })?;

        weights.push(entry.clone());
        self.save(WEIGHTS, &weights)?;
        Ok(entry)
    }

    /// Record a completed session made of catalog exercises.
    pub fn log_session(&mut self, name: &str, exercise_ids: &[u64]) -> Result<Entry> {
        self.log_session_at(name, exercise_ids, now())
    }

    pub fn log_session_at(
        &mut self,
        name: &str,
        exercise_ids: &[u64],
        at: NaiveDateTime,
    ) -> Result<Entry> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest(
                "Session name must not be empty".to_string(),
            ));
        }

        let catalog = self.load(EXERCISES)?;
        let mut completed = Vec::with_capacity(exercise_ids.len());
        for &id in exercise_ids {
            let exercise = catalog
                .iter()
                .find(|e| field_u64(e, "id") == Some(id))
                .ok_or_else(|| AppError::NotFound(format!("No exercise with id {}", id)))?;

            let mut item = Entry::new();
            item.insert("exercise_id".to_string(), Value::from(id));
            if let Some(exercise_name) = exercise.get("name") {
                item.insert("name".to_string(), exercise_name.clone());
            }
            completed.push(item);
        }

        let mut sessions = self.load(SESSIONS)?;
        let entry = to_entry(&Session {
            id: next_id(&sessions),
            name: name.to_string(),
            date: format_timestamp(at),
            exercises: completed,
        })?;

        sessions.push(entry.clone());
        self.save(SESSIONS, &sessions)?;
        Ok(entry)
    }

    /// Log a predefined session with all of its exercises. Unnamed sessions
    /// are called `<title> - <YYYY-MM-DD>`.
    pub fn log_preset_session(
        &mut self,
        preset: SessionPreset,
        name: Option<&str>,
    ) -> Result<Entry> {
        self.log_preset_session_at(preset, name, now())
    }

    pub fn log_preset_session_at(
        &mut self,
        preset: SessionPreset,
        name: Option<&str>,
        at: NaiveDateTime,
    ) -> Result<Entry> {
        let ids: Vec<u64> = self
            .session_exercises(preset)?
            .iter()
            .filter_map(|e| field_u64(e, "id"))
            .collect();
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("{} - {}", preset.title(), at.format("%Y-%m-%d")),
        };
        self.log_session_at(&name, &ids, at)
    }

    /// Weight logs of one exercise, in the order they were logged.
    pub fn exercise_history(&mut self, exercise_id: u64) -> Result<Vec<Entry>> {
        self.exercise(exercise_id)?;
        let mut weights = self.load(WEIGHTS)?;
        weights.retain(|log| field_u64(log, "exercise_id") == Some(exercise_id));
        Ok(weights)
    }

    /// Sessions from the last `days` days, newest first.
    pub fn history(&mut self, days: i64) -> Result<Vec<Entry>> {
        self.history_at(days, now())
    }

    pub fn history_at(&mut self, days: i64, now: NaiveDateTime) -> Result<Vec<Entry>> {
        let cutoff = Duration::try_days(days)
            .and_then(|span| now.checked_sub_signed(span))
            .ok_or_else(|| {
                AppError::BadRequest(format!("History of {} days is out of range", days))
            })?;

        let mut recent: Vec<(NaiveDateTime, Entry)> = Vec::new();
        for session in self.load(SESSIONS)? {
            match field_str(&session, "date").and_then(parse_timestamp) {
                Some(at) if at >= cutoff => recent.push((at, session)),
                Some(_) => {}
                None => tracing::warn!(
                    "Skipping session {} with unparsable date",
                    field_u64(&session, "id").map_or("?".to_string(), |id| id.to_string())
                ),
            }
        }

        recent.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(recent.into_iter().map(|(_, session)| session).collect())
    }

    /// Summarize the past week and append the summary to `reports`.
    pub fn weekly_report(&mut self) -> Result<WeeklyReport> {
        self.weekly_report_at(now())
    }

    pub fn weekly_report_at(&mut self, now: NaiveDateTime) -> Result<WeeklyReport> {
        let sessions = self.history_at(REPORT_WEEK_DAYS, now)?;
        let weights = self.load(WEIGHTS)?;

        let total_exercises = sessions
            .iter()
            .map(|s| s.get("exercises").and_then(Value::as_array).map_or(0, Vec::len))
            .sum();

        let report = WeeklyReport {
            week_start: format_timestamp(now - Duration::days(REPORT_WEEK_DAYS)),
            week_end: format_timestamp(now),
            total_sessions: sessions.len(),
            total_exercises,
            sessions,
            progress_summary: progress_summary(&weights),
        };

        let mut reports = self.load(REPORTS)?;
        reports.push(to_entry(&report)?);
        self.save(REPORTS, &reports)?;

        Ok(report)
    }

    /// Streaks, trends and insight messages over all sessions and logs.
    pub fn insights(&mut self) -> Result<Insights> {
        self.insights_at(now())
    }

    pub fn insights_at(&mut self, now: NaiveDateTime) -> Result<Insights> {
        let sessions = self.load(SESSIONS)?;
        let weights = self.load(WEIGHTS)?;
        Ok(analytics::insights(&sessions, &weights, now.date()))
    }

    pub fn health(&self) -> Result<HealthReport> {
        Ok(self.storage.health()?)
    }
}

/// Recent weight progression grouped by exercise id.
fn progress_summary(weights: &[Entry]) -> BTreeMap<String, Vec<ProgressPoint>> {
    let start = weights.len().saturating_sub(PROGRESS_WINDOW);
    let mut progress: BTreeMap<String, Vec<ProgressPoint>> = BTreeMap::new();

    for log in &weights[start..] {
        let key = match log.get("exercise_id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "null".to_string(),
            Some(other) => other.to_string(),
        };
        progress.entry(key).or_default().push(ProgressPoint {
            weight: log.get("weight").cloned().unwrap_or_else(|| Value::from(0)),
            date: field_str(log, "date").map(str::to_string),
        });
    }

    progress
}

/// Distinct workout days among `sessions`.
pub fn workout_days(sessions: &[Entry]) -> usize {
    sessions
        .iter()
        .filter_map(entry_day)
        .collect::<std::collections::BTreeSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn progress_summary_keeps_last_fifty_logs() {
        let weights: Vec<Entry> = (0..60)
            .map(|i| {
                serde_json::from_value(json!({
                    "exercise_id": if i < 30 { 1 } else { 2 },
                    "weight": i,
                    "date": "2026-10-19T08:00:00"
                }))
                .unwrap()
            })
            .collect();

        let summary = progress_summary(&weights);
        assert_eq!(summary["1"].len(), 20);
        assert_eq!(summary["2"].len(), 30);
        assert_eq!(summary["1"][0].weight, json!(10));
    }

    #[test]
    fn workout_days_are_distinct() {
        let sessions: Vec<Entry> = serde_json::from_value(json!([
            {"date": "2026-10-18T07:00:00"},
            {"date": "2026-10-18T19:00:00"},
            {"date": "2026-10-19T07:00:00"}
        ]))
        .unwrap();
        assert_eq!(workout_days(&sessions), 2);
    }
}
