//! Natural-language due-date resolution.
//!
//! Resolves free-form phrases ("tomorrow", "next friday", "in 3 days") into
//! an absolute instant, interpreted against an explicit `anchor` in an IANA
//! timezone. Used for one-off task due dates only — recurrence text goes
//! through [`crate::rule::normalize_natural`] instead.
//!
//! Date-granular phrases resolve to the local start of the named day. The
//! resolver never guesses: anything it cannot parse deterministically is an
//! error, which rule-level callers surface as a generic invalid-rule failure.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::CadenceError;
use crate::rule::AliasTables;
use crate::time;

/// Resolve a due-date phrase to an absolute instant.
///
/// Keyword aliases from `aliases` (e.g. "eod" → "today") are substituted
/// before parsing.
///
/// # Supported Phrases
///
/// **Passthrough**: RFC 3339 datetimes, ISO dates (`2026-03-15`)
///
/// **Anchored**: `"now"`, `"today"`, `"tomorrow"`, `"yesterday"`
///
/// **Weekdays**: `"friday"` (today or the next one), `"next friday"`
/// (always future), `"this monday"`, `"last tuesday"`
///
/// **Offsets**: `"in 3 days"`, `"in 2 weeks"`
///
/// # Errors
///
/// Returns [`CadenceError::InvalidTimezone`] for an unknown zone name, or
/// [`CadenceError::InvalidExpression`] if the phrase cannot be parsed.
pub fn resolve_due_phrase(
    phrase: &str,
    anchor: DateTime<Utc>,
    timezone: &str,
    aliases: &AliasTables,
) -> Result<DateTime<Utc>, CadenceError> {
    let tz = time::parse_timezone(timezone)?;
    let normalized = normalize_phrase(phrase);
    let normalized = aliases
        .due_dates
        .get(&normalized)
        .cloned()
        .unwrap_or(normalized);
    let local_anchor = anchor.with_timezone(&tz);

    try_passthrough_rfc3339(&normalized)
        .or_else(|| try_iso_date(&normalized, tz))
        .or_else(|| try_anchored(&normalized, anchor, tz))
        .or_else(|| try_weekday_relative(&normalized, local_anchor.date_naive(), tz))
        .or_else(|| try_day_offset(&normalized, local_anchor.date_naive(), tz))
        .ok_or_else(|| {
            CadenceError::InvalidExpression(format!(
                "cannot parse due-date phrase: '{}'",
                phrase.trim()
            ))
        })
}

/// Lowercase, trim, and collapse whitespace runs.
pub(crate) fn normalize_phrase(s: &str) -> String {
    let mut result = String::new();
    let mut prev_space = false;
    for ch in s.trim().chars() {
        if ch.is_whitespace() {
            if !prev_space {
                result.push(' ');
            }
            prev_space = true;
        } else {
            result.extend(ch.to_lowercase());
            prev_space = false;
        }
    }
    result
}

/// Parse a weekday name, full or abbreviated.
pub(crate) fn parse_weekday(s: &str) -> Option<Weekday> {
    match s {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn day_start_utc(day: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    time::start_of_day(day, tz)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn try_passthrough_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn try_iso_date(s: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    day_start_utc(date, tz)
}

fn try_anchored(s: &str, anchor: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    let today = time::today_in(anchor, tz);
    match s {
        "now" => Some(anchor),
        "today" => day_start_utc(today, tz),
        "tomorrow" => day_start_utc(today.succ_opt()?, tz),
        "yesterday" => day_start_utc(today.pred_opt()?, tz),
        _ => None,
    }
}

/// "friday", "next monday", "this wednesday", "last tuesday".
fn try_weekday_relative(s: &str, today: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = s.splitn(2, ' ').collect();
    let (modifier, weekday) = match parts.as_slice() {
        [single] => ("", parse_weekday(single)?),
        [modifier, name] => (*modifier, parse_weekday(name)?),
        _ => return None,
    };

    let current = today.weekday();
    let forward =
        (weekday.num_days_from_monday() as i64 - current.num_days_from_monday() as i64 + 7) % 7;

    let target = match modifier {
        // Bare weekday: today counts, otherwise the next occurrence.
        "" => today + chrono::Duration::days(forward),
        "next" => today + chrono::Duration::days(if forward == 0 { 7 } else { forward }),
        "this" => {
            let diff =
                weekday.num_days_from_monday() as i64 - current.num_days_from_monday() as i64;
            today + chrono::Duration::days(diff)
        }
        "last" => {
            let back = (current.num_days_from_monday() as i64
                - weekday.num_days_from_monday() as i64
                + 7)
                % 7;
            today - chrono::Duration::days(if back == 0 { 7 } else { back })
        }
        _ => return None,
    };

    day_start_utc(target, tz)
}

/// "in 3 days", "in 2 weeks".
fn try_day_offset(s: &str, today: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    let rest = s.strip_prefix("in ")?;
    let parts: Vec<&str> = rest.split_whitespace().collect();
    if parts.len() != 2 {
        return None;
    }
    let n: i64 = parts[0].parse().ok()?;
    let days = match parts[1] {
        "day" | "days" => n,
        "week" | "weeks" => n * 7,
        _ => return None,
    };
    day_start_utc(today + chrono::Duration::days(days), tz)
}

// ── Tests ───────────────────────────────────────────────────────────────────
