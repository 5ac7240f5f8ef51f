//! Habit- and task-level schedule predicates.
//!
//! Composes the rule normalizer, the occurrence evaluator, and the time
//! context into the questions a schedule view asks: due today, completed,
//! overdue, frequency bucket, display text. Everything is a pure function of
//! a [`Habit`] snapshot, a timezone, and an explicit anchor instant — the
//! engine never mutates or retains caller-owned data.
//!
//! Failure policy: normalization and evaluation failures never escape to the
//! display surface. They degrade to "not due" (or the daily bucket), carry a
//! diagnostic in the returned value, and emit a `tracing` warning naming the
//! habit — one bad record must not break an entire schedule view.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CadenceError;
use crate::occurrence;
use crate::rule::{self, AliasTables, FrequencyClass, Normalized};
use crate::time;

/// What governs a habit's schedule: a one-off due date or a recurrence rule.
///
/// A task's due date is a stored instant string (RFC 3339, UTC at rest), or
/// `None` when no date has been set. A recurring habit carries its rule
/// string verbatim; normalization is re-run on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Schedule {
    Task(Option<String>),
    Recurring(String),
}

impl Schedule {
    pub fn is_task(&self) -> bool {
        matches!(self, Self::Task(_))
    }
}

/// Read-only snapshot of a habit or one-off task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub schedule: Schedule,
    #[serde(default)]
    pub archived: bool,
    /// Completions required per day; zero or absent means one.
    #[serde(default)]
    pub target_completions: u32,
    /// Append-only completion instants, insertion order. Duplicates on the
    /// same day are counted.
    #[serde(default)]
    pub completions: Vec<String>,
}

impl Habit {
    fn target(&self) -> u32 {
        self.target_completions.max(1)
    }
}

/// A due answer plus the diagnostic (if any) behind a degraded `false`.
///
/// Callers that just want the boolean read `.due`; callers that surface
/// problems read `.diagnostic` instead of relying on the log side channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Due {
    pub due: bool,
    pub diagnostic: Option<String>,
}

impl Due {
    fn answer(due: bool) -> Self {
        Self {
            due,
            diagnostic: None,
        }
    }

    fn degraded(habit: &Habit, error: &CadenceError) -> Self {
        warn!(habit = %habit.id, %error, "schedule evaluation degraded to not due");
        Self {
            due: false,
            diagnostic: Some(format!("habit '{}': {}", habit.id, error)),
        }
    }
}

/// Count of completions recorded on `day` as seen in `tz`.
///
/// Completion entries that fail to parse are skipped.
pub fn completions_on(habit: &Habit, day: NaiveDate, tz: Tz) -> usize {
    habit
        .completions
        .iter()
        .filter_map(|s| time::parse_instant(s).ok())
        .filter(|instant| time::local_day(*instant, tz) == day)
        .count()
}

/// Whether today's completion count has reached the habit's target.
pub fn is_completed(habit: &Habit, tz: Tz, anchor: DateTime<Utc>) -> bool {
    completions_on(habit, time::today_in(anchor, tz), tz) >= habit.target() as usize
}

/// Today's completion progress as a percentage, capped at 100.
pub fn progress(habit: &Habit, tz: Tz, anchor: DateTime<Utc>) -> u32 {
    let count = completions_on(habit, time::today_in(anchor, tz), tz) as u32;
    (count * 100 / habit.target()).min(100)
}

/// Whether the habit is due on `day` in `tz`.
///
/// Tasks are due on exactly the zoned calendar day of their due instant —
/// never on a recurrence basis, and regardless of archival (overdue handles
/// archived tasks separately). Archived recurring habits are never due.
/// Recurring habits delegate to the occurrence evaluator; any normalization
/// or evaluation failure degrades to not-due with a diagnostic.
pub fn due_on(habit: &Habit, tz: Tz, day: NaiveDate, aliases: &AliasTables) -> Due {
    match &habit.schedule {
        Schedule::Task(None) => Due::answer(false),
        Schedule::Task(Some(due_str)) => match time::parse_instant(due_str) {
            Ok(instant) => Due::answer(time::local_day(instant, tz) == day),
            Err(e) => Due::degraded(habit, &e),
        },
        Schedule::Recurring(_) if habit.archived => Due::answer(false),
        Schedule::Recurring(text) => match rule::normalize(text, aliases) {
            Ok(normalized) => match occurrence::evaluate(&normalized, tz, day) {
                Ok(due) => Due::answer(due),
                Err(e) => Due::degraded(habit, &e),
            },
            Err(e) => Due::degraded(habit, &e),
        },
    }
}

/// [`due_on`] for the anchor's calendar day in `tz`.
pub fn due_today(habit: &Habit, tz: Tz, anchor: DateTime<Utc>, aliases: &AliasTables) -> Due {
    due_on(habit, tz, time::today_in(anchor, tz), aliases)
}

/// Whether a task's due day has passed without completion.
///
/// Only meaningful for tasks: recurring habits and archived tasks are never
/// overdue. True iff the due day is strictly before today's day in `tz` and
/// the task has not met its completion target today.
pub fn is_overdue(habit: &Habit, tz: Tz, anchor: DateTime<Utc>) -> bool {
    if habit.archived {
        return false;
    }
    let Schedule::Task(Some(due_str)) = &habit.schedule else {
        return false;
    };
    let due_day = match time::parse_instant(due_str) {
        Ok(instant) => time::local_day(instant, tz),
        Err(error) => {
            warn!(habit = %habit.id, %error, "unreadable task due date; treating as not overdue");
            return false;
        }
    };
    due_day < time::today_in(anchor, tz) && !is_completed(habit, tz, anchor)
}

/// The habit's canonical frequency bucket.
///
/// Tasks are always daily (there is no recurring-task support). Recurring
/// habits classify from the normalized rule; unsupported or unreadable rules
/// fall back to daily with a warning.
pub fn frequency_class(habit: &Habit, aliases: &AliasTables) -> FrequencyClass {
    let Schedule::Recurring(text) = &habit.schedule else {
        return FrequencyClass::Daily;
    };
    match rule::normalize(text, aliases) {
        Ok(Normalized::Valid(rule)) => rule.class(),
        Ok(Normalized::Unsupported) => {
            warn!(habit = %habit.id, "unsupported rule frequency; defaulting to daily");
            FrequencyClass::Daily
        }
        Err(error) => {
            warn!(habit = %habit.id, %error, "unreadable rule; defaulting to daily");
            FrequencyClass::Daily
        }
    }
}

/// Human-readable schedule text.
///
/// Recurring rules render through [`crate::rule::CanonicalRule::describe`],
/// or the literal `"invalid"` when normalization fails. Tasks render their
/// due date as weekday + date in `tz`, or a placeholder when unset.
pub fn display_text(schedule: &Schedule, tz: Tz, aliases: &AliasTables) -> String {
    match schedule {
        Schedule::Recurring(text) => match rule::normalize_natural(text, aliases) {
            Ok(Normalized::Valid(rule)) => rule.describe(),
            Ok(Normalized::Unsupported) | Err(_) => "invalid".to_string(),
        },
        Schedule::Task(None) => "No due date".to_string(),
        Schedule::Task(Some(due_str)) => match time::parse_instant(due_str) {
            Ok(instant) => time::zoned(instant, tz).format("%A, %b %-d").to_string(),
            Err(_) => "invalid".to_string(),
        },
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
