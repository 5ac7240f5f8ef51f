//! Timezone-aware conversions between stored instants and local calendar days.
//!
//! Stored values are absolute instants (RFC 3339, UTC at rest). Everything
//! calendar-shaped — "today", day boundaries, same-day comparison — is derived
//! by interpreting an instant in an IANA timezone. All functions here are pure
//! functions of their inputs; [`now`] is the single impure entry point in the
//! crate, and callers thread its result through as an explicit anchor.

use chrono::{DateTime, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::CadenceError;

/// Read the system clock. The only non-deterministic input in the crate;
/// every other function takes the resulting anchor as a parameter.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse an RFC 3339 instant string into `DateTime<Utc>`.
///
/// # Errors
///
/// Returns [`CadenceError::InvalidDatetime`] if the string is not RFC 3339.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>, CadenceError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CadenceError::InvalidDatetime(format!("'{}': {}", s, e)))
}

/// Serialize an instant for storage. Round-trips exactly with [`parse_instant`].
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339()
}

/// Parse an IANA timezone name into `Tz`.
///
/// # Errors
///
/// Returns [`CadenceError::InvalidTimezone`] if the name is not a valid
/// IANA timezone.
pub fn parse_timezone(s: &str) -> Result<Tz, CadenceError> {
    s.parse::<Tz>()
        .map_err(|_| CadenceError::InvalidTimezone(format!("'{}'", s)))
}

/// Interpret an instant in a timezone, exposing calendar components.
pub fn zoned(instant: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    instant.with_timezone(&tz)
}

/// The calendar date an instant falls on as seen in `tz`. The single
/// day-bucketing primitive: schedule predicates and ledger aggregation both
/// go through here so "due today" and "earned today" can never drift.
pub fn local_day(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// The calendar date of `anchor` as seen in `tz`.
pub fn today_in(anchor: DateTime<Utc>, tz: Tz) -> NaiveDate {
    local_day(anchor, tz)
}

/// The first valid instant of `day` in `tz`.
///
/// Usually local midnight. On spring-forward days where midnight does not
/// exist (some zones skip 00:00), the earliest existing local time is used;
/// on fall-back days where it exists twice, the earlier instant wins.
///
/// # Errors
///
/// Returns [`CadenceError::Evaluation`] if no valid local time can be found
/// for the day at all.
pub fn start_of_day(day: NaiveDate, tz: Tz) -> Result<DateTime<Tz>, CadenceError> {
    let midnight = day.and_hms_opt(0, 0, 0).ok_or_else(|| {
        CadenceError::Evaluation(format!("cannot build midnight for {day}"))
    })?;
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earlier, _) => Ok(earlier),
        LocalResult::None => {
            // Midnight fell into a DST gap. Scan forward for the first
            // wall-clock minute that exists on this day.
            for minutes in 1..=180 {
                let candidate = midnight + chrono::Duration::minutes(minutes);
                if let LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) =
                    tz.from_local_datetime(&candidate)
                {
                    return Ok(dt);
                }
            }
            Err(CadenceError::Evaluation(format!(
                "no valid start of day for {day} in {tz}"
            )))
        }
    }
}

/// The last instant of `day` in `tz` (23:59:59 wall clock; the later
/// instant when that time occurs twice).
///
/// # Errors
///
/// Returns [`CadenceError::Evaluation`] if no valid local time exists.
pub fn end_of_day(day: NaiveDate, tz: Tz) -> Result<DateTime<Tz>, CadenceError> {
    let last = day.and_hms_opt(23, 59, 59).ok_or_else(|| {
        CadenceError::Evaluation(format!("cannot build end of day for {day}"))
    })?;
    match tz.from_local_datetime(&last) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(_, later) => Ok(later),
        LocalResult::None => {
            for minutes in 1..=180 {
                let candidate = last - chrono::Duration::minutes(minutes);
                if let LocalResult::Single(dt) | LocalResult::Ambiguous(_, dt) =
                    tz.from_local_datetime(&candidate)
                {
                    return Ok(dt);
                }
            }
            Err(CadenceError::Evaluation(format!(
                "no valid end of day for {day} in {tz}"
            )))
        }
    }
}

/// Whether two instants fall on the same calendar day as seen in `tz`.
///
/// This compares zoned day boundaries, not absolute 24-hour windows: two
/// instants 20 hours apart may or may not share a day depending on the zone.
pub fn same_calendar_day(a: DateTime<Utc>, b: DateTime<Utc>, tz: Tz) -> bool {
    local_day(a, tz) == local_day(b, tz)
}

// ── Tests ───────────────────────────────────────────────────────────────────
