//! Command-line interface.

use crate::error::{AppError, Result};
use crate::export;
use crate::records::{field_f64, field_str, field_u64, SessionPreset};
use crate::tracker::{workout_days, Tracker};
use clap::{Parser, Subcommand};
use gymlog_store::collections::ALL;
use gymlog_store::{validate_collection_name, Entry, ExportMetadata};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;

/// Default history window, in days.
pub const DEFAULT_HISTORY_DAYS: i64 = 30;

#[derive(Debug, Parser)]
#[command(name = "gymlog")]
#[command(about = "Log workouts and weights to a local, backed-up data directory")]
pub struct Cli {
    /// Data directory (overrides GYMLOG_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the exercise catalog
    Exercises {
        #[arg(long)]
        category: Option<String>,
    },
    /// List the exercises of a predefined session
    Session {
        #[arg(value_enum)]
        preset: SessionPreset,
    },
    /// Add an exercise to the catalog
    AddExercise {
        name: String,
        #[arg(long, default_value = "General")]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Log a weight and rep count for an exercise
    LogWeight {
        exercise_id: u64,
        /// Weight in kg
        weight: f64,
        reps: u32,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Log a completed workout session
    LogSession {
        #[arg(required_unless_present = "preset")]
        name: Option<String>,
        /// Exercise ids completed in the session
        #[arg(long = "exercise", value_name = "ID")]
        exercises: Vec<u64>,
        /// Log every exercise of a predefined session
        #[arg(long, value_enum, conflicts_with = "exercises")]
        preset: Option<SessionPreset>,
    },
    /// Show recent sessions newest first, or the weight logs of one exercise
    History {
        #[arg(long, default_value_t = DEFAULT_HISTORY_DAYS)]
        days: i64,
        #[arg(long, value_name = "ID", conflicts_with = "days")]
        exercise: Option<u64>,
    },
    /// Generate and store a weekly report
    Report,
    /// Show streaks, trends and suggestions
    Insights,
    /// Export one collection as CSV, or everything as a JSON snapshot
    Export {
        #[arg(long, short)]
        output: PathBuf,
        /// Collection to export as CSV; omit for a full JSON snapshot
        #[arg(long)]
        collection: Option<String>,
    },
    /// Import a JSON snapshot written by `export`
    Import { input: PathBuf },
    /// List backups, newest first
    Backups { collection: Option<String> },
    /// Replace a collection with its newest valid backup
    Restore { collection: String },
    /// Show storage health and performance
    Health,
}

fn print_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn print_exercise<W: Write>(out: &mut W, exercise: &Entry) -> Result<()> {
    writeln!(
        out,
        "{:>4}  {:<26} {}",
        field_u64(exercise, "id").map_or("-".to_string(), |id| id.to_string()),
        field_str(exercise, "name").unwrap_or("?"),
        field_str(exercise, "category").unwrap_or(""),
    )?;
    Ok(())
}

/// Run `command` against `tracker`, writing output to `out`.
pub fn execute<W: Write>(command: Command, tracker: &mut Tracker, out: &mut W) -> Result<()> {
    match command {
        Command::Exercises { category } => {
            let exercises = tracker.exercises(category.as_deref())?;
            for exercise in &exercises {
                print_exercise(out, exercise)?;
            }
            writeln!(out, "{} exercises", exercises.len())?;
        }
        Command::Session { preset } => {
            let exercises = tracker.session_exercises(preset)?;
            for exercise in &exercises {
                print_exercise(out, exercise)?;
            }
            writeln!(out, "{} exercises in {}", exercises.len(), preset.title())?;
        }
        Command::AddExercise {
            name,
            category,
            description,
        } => {
            let exercise = tracker.add_exercise(&name, &category, &description)?;
            write!(out, "Added ")?;
            print_exercise(out, &exercise)?;
        }
        Command::LogWeight {
            exercise_id,
            weight,
            reps,
            notes,
        } => {
            let exercise = tracker.exercise(exercise_id)?;
            let log = tracker.log_weight(exercise_id, weight, reps, &notes)?;
            writeln!(
                out,
                "Logged {}: {}kg x {} reps",
                field_str(&exercise, "name").unwrap_or("?"),
                field_f64(&log, "weight").unwrap_or(weight),
                reps
            )?;
        }
        Command::LogSession {
            name,
            exercises,
            preset,
        } => {
            let session = match preset {
                Some(preset) => tracker.log_preset_session(preset, name.as_deref())?,
                None => tracker.log_session(name.as_deref().unwrap_or_default(), &exercises)?,
            };
            writeln!(
                out,
                "Saved session #{} '{}' with {} exercises",
                field_u64(&session, "id").unwrap_or(0),
                field_str(&session, "name").unwrap_or("?"),
                session
                    .get("exercises")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len)
            )?;
        }
        Command::History {
            exercise: Some(exercise_id),
            ..
        } => {
            let exercise = tracker.exercise(exercise_id)?;
            let logs = tracker.exercise_history(exercise_id)?;
            for log in &logs {
                writeln!(
                    out,
                    "{}  {}kg x {} reps  {}",
                    field_str(log, "date").unwrap_or("?"),
                    field_f64(log, "weight").unwrap_or(0.0),
                    field_u64(log, "reps").unwrap_or(0),
                    field_str(log, "notes").unwrap_or("")
                )?;
            }
            writeln!(
                out,
                "{} logs for {}",
                logs.len(),
                field_str(&exercise, "name").unwrap_or("?")
            )?;
        }
        Command::History { days, .. } => {
            if days < 0 {
                return Err(AppError::BadRequest("Days must not be negative".into()));
            }
            let sessions = tracker.history(days)?;
            for session in &sessions {
                let count = session
                    .get("exercises")
                    .and_then(|e| e.as_array())
                    .map_or(0, Vec::len);
                writeln!(
                    out,
                    "{}  {}  ({} exercises)",
                    field_str(session, "date").unwrap_or("?"),
                    field_str(session, "name").unwrap_or("Workout"),
                    count
                )?;
            }
            writeln!(
                out,
                "{} sessions on {} days in the last {} days",
                sessions.len(),
                workout_days(&sessions),
                days
            )?;
        }
        Command::Report => print_json(out, &tracker.weekly_report()?)?,
        Command::Insights => {
            let insights = tracker.insights()?;
            writeln!(
                out,
                "Current streak: {} days, longest: {} days, total: {} days",
                insights.streaks.current_streak,
                insights.streaks.longest_streak,
                insights.streaks.total_days
            )?;
            for message in &insights.messages {
                writeln!(out, "- {}", message)?;
            }
        }
        Command::Export { output, collection } => match collection {
            Some(collection) => {
                validate_collection_name(&collection)?;
                let rows =
                    export::export_collection_csv(tracker.storage_mut(), &collection, &output)?;
                writeln!(out, "Exported {} rows to {}", rows, output.display())?;
            }
            None => {
                let export = export::export_snapshot(tracker.storage_mut(), &ALL, &output)?;
                print_json(out, &ExportMetadata::from(&export))?;
            }
        },
        Command::Import { input } => {
            let export = export::import_snapshot(tracker.storage_mut(), &input)?;
            writeln!(
                out,
                "Imported {} entries in {} collections",
                export.entry_count(),
                export.collections.len()
            )?;
        }
        Command::Backups { collection } => {
            let backups = match &collection {
                Some(collection) => tracker.storage().list_backups(collection)?,
                None => tracker.storage().list_all_backups()?,
            };
            for backup in &backups {
                writeln!(
                    out,
                    "{}  {:<10} {}",
                    backup.created_at.format("%Y-%m-%d %H:%M:%S"),
                    backup.collection,
                    backup.file_name()
                )?;
            }
            writeln!(out, "{} backups", backups.len())?;
        }
        Command::Restore { collection } => {
            let backup = tracker.storage_mut().restore_from_backup(&collection)?;
            writeln!(out, "Restored {} from {}", collection, backup.file_name())?;
        }
        Command::Health => print_json(out, &tracker.health()?)?,
    }

    Ok(())
}
