//! Workout analytics: streaks, progress trends and insight messages.

use crate::records::{entry_day, field_f64, field_str, field_u64};
use chrono::NaiveDate;
use gymlog_store::Entry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Percentage change beyond which a trend counts as improving or declining.
pub const TREND_THRESHOLD_PERCENT: f64 = 10.0;

/// Streak length celebrated by the insights.
const STREAK_GOAL_DAYS: u32 = 7;

/// Consecutive-day workout streaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streaks {
    /// Run of consecutive days ending today or yesterday
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Distinct days with at least one session
    pub total_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
    InsufficientData,
}

/// Weight progression of one exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressTrend {
    pub trend: Trend,
    pub change_percent: f64,
    pub first_weight: f64,
    pub latest_weight: f64,
    pub total_sessions: usize,
}

/// Everything the insights view shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub streaks: Streaks,
    pub trends: BTreeMap<u64, ProgressTrend>,
    pub messages: Vec<String>,
}

/// Compute streaks from session dates. Sessions without a parsable date are
/// ignored.
pub fn workout_streaks(sessions: &[Entry], today: NaiveDate) -> Streaks {
    let days: BTreeSet<NaiveDate> = sessions.iter().filter_map(entry_day).collect();

    let Some(&last) = days.iter().next_back() else {
        return Streaks::default();
    };

    let mut longest = 1;
    let mut run = 1;
    let mut previous: Option<NaiveDate> = None;
    for &day in &days {
        if let Some(prev) = previous {
            if (day - prev).num_days() == 1 {
                run += 1;
                longest = longest.max(run);
            } else {
                run = 1;
            }
        }
        previous = Some(day);
    }

    let current = if (today - last).num_days() <= 1 { run } else { 0 };

    Streaks {
        current_streak: current,
        longest_streak: longest,
        total_days: days.len() as u32,
    }
}

/// Compare the first and latest logged weight of each exercise.
///
/// Logs are ordered by their `date` field; logs without an `exercise_id`
/// are ignored.
pub fn progress_trends(weights: &[Entry]) -> BTreeMap<u64, ProgressTrend> {
    let mut by_exercise: BTreeMap<u64, Vec<&Entry>> = BTreeMap::new();
    for log in weights {
        if let Some(id) = field_u64(log, "exercise_id").filter(|&id| id > 0) {
            by_exercise.entry(id).or_default().push(log);
        }
    }

    by_exercise
        .into_iter()
        .map(|(id, mut logs)| {
            logs.sort_by(|a, b| {
                let a = field_str(a, "date").unwrap_or("");
                let b = field_str(b, "date").unwrap_or("");
                a.cmp(b)
            });
            (id, trend_for(&logs))
        })
        .collect()
}

fn trend_for(logs: &[&Entry]) -> ProgressTrend {
    let weight = |log: &Entry| field_f64(log, "weight").unwrap_or(0.0);
    let (first, latest) = match logs {
        [first, .., last] => (weight(*first), weight(*last)),
        _ => {
            return ProgressTrend {
                trend: Trend::InsufficientData,
                change_percent: 0.0,
                first_weight: logs.first().map_or(0.0, |log| weight(*log)),
                latest_weight: logs.first().map_or(0.0, |log| weight(*log)),
                total_sessions: logs.len(),
            }
        }
    };

    let change = if first > 0.0 {
        (latest - first) / first * 100.0
    } else {
        0.0
    };

    let trend = if change > TREND_THRESHOLD_PERCENT {
        Trend::Improving
    } else if change < -TREND_THRESHOLD_PERCENT {
        Trend::Declining
    } else {
        Trend::Stable
    };

    ProgressTrend {
        trend,
        change_percent: (change * 100.0).round() / 100.0,
        first_weight: first,
        latest_weight: latest,
        total_sessions: logs.len(),
    }
}

/// Streaks, trends and the messages derived from them.
pub fn insights(sessions: &[Entry], weights: &[Entry], today: NaiveDate) -> Insights {
    let streaks = workout_streaks(sessions, today);
    let trends = progress_trends(weights);
    let mut messages = Vec::new();

    if !sessions.is_empty() {
        let days = streaks.total_days;
        messages.push(
            if days >= 5 {
                "Excellent consistency! You're working out 5+ days."
            } else if days >= 3 {
                "Good progress! Aim for 5+ workout days for optimal results."
            } else {
                "Try to increase workout frequency to 3-5 days per week."
            }
            .to_string(),
        );
    }

    let improving = trends
        .values()
        .filter(|t| t.trend == Trend::Improving)
        .count();
    if improving > 0 {
        messages.push(format!("You're making progress in {} exercises!", improving));
    }

    if streaks.current_streak >= STREAK_GOAL_DAYS {
        messages.push(format!(
            "Amazing! {}-day workout streak!",
            streaks.current_streak
        ));
    } else if streaks.longest_streak >= STREAK_GOAL_DAYS {
        messages.push(format!(
            "Your best streak was {} days. You can do it again!",
            streaks.longest_streak
        ));
    }

    if messages.is_empty() {
        messages.push("Start tracking your workouts to get personalized insights!".to_string());
    }

    Insights {
        streaks,
        trends,
        messages,
    }
}
