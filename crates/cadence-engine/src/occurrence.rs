//! Single-day occurrence evaluation.
//!
//! Answers exactly one question: does a rule produce an occurrence on a given
//! local calendar day in a given timezone? The engine never computes
//! occurrence lists — expansion is constrained to one instance per query.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use rrule::Tz as RRuleTz;

use crate::error::CadenceError;
use crate::rule::{CanonicalRule, Normalized};
use crate::time;

/// Whether `rule` produces an occurrence within `day` as seen in `tz`.
///
/// The rule's anchor is re-bound to the start of the queried day, so the
/// result depends only on the rule and the calendar day, never on any
/// time-of-day component of the caller's clock.
///
/// An occurrence counts only if, after converting it back to an absolute
/// instant and re-zoning it into the caller's timezone, it falls within the
/// day's [start, end] window. The round trip through UTC is deliberate: the
/// rule library normalizes datetimes through its own zone representation,
/// and comparing in the caller's zone is what keeps DST-transition days
/// honest.
///
/// Monthly and yearly rules whose anchor day does not exist in a given
/// period (day 31 in a 30-day month) simply produce no match for that
/// period.
///
/// # Errors
///
/// Returns [`CadenceError::Evaluation`] if the day's boundaries cannot be
/// computed or the rule fails validation against the anchor.
pub fn is_due_on(rule: &CanonicalRule, tz: Tz, day: NaiveDate) -> Result<bool, CadenceError> {
    let start = time::start_of_day(day, tz)?;
    let end = time::end_of_day(day, tz)?;

    let anchor = start.with_timezone(&RRuleTz::Tz(tz));
    let set = rule
        .inner()
        .clone()
        .build(anchor)
        .map_err(|e| CadenceError::Evaluation(format!("cannot anchor rule '{rule}': {e}")))?;

    let expansion = set.all(1);
    let Some(occurrence) = expansion.dates.first() else {
        return Ok(false);
    };

    let occurrence_local = occurrence.with_timezone(&Utc).with_timezone(&tz);
    Ok(occurrence_local >= start && occurrence_local <= end)
}

/// Evaluate a normalization outcome for `day`.
///
/// # Errors
///
/// An [`Normalized::Unsupported`] rule fails with
/// [`CadenceError::Evaluation`] — never a silent "not due". Catching and
/// downgrading is the caller's decision.
pub fn evaluate(normalized: &Normalized, tz: Tz, day: NaiveDate) -> Result<bool, CadenceError> {
    match normalized {
        Normalized::Valid(rule) => is_due_on(rule, tz, day),
        Normalized::Unsupported => Err(CadenceError::Evaluation(
            "refusing to expand an unsupported rule".to_string(),
        )),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{normalize, AliasTables};

    fn rule(input: &str) -> CanonicalRule {
        match normalize(input, &AliasTables::default()).unwrap() {
            Normalized::Valid(rule) => rule,
            Normalized::Unsupported => panic!("expected valid rule for '{input}'"),
        }
    }

    fn tz(name: &str) -> Tz {
        name.parse().unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_rule_is_due_every_day() {
        let daily = rule("daily");
        let ny = tz("America/New_York");
        assert!(is_due_on(&daily, ny, day(2026, 2, 18)).unwrap());
        assert!(is_due_on(&daily, ny, day(2026, 2, 19)).unwrap());
    }

    #[test]
    fn weekly_byday_matches_only_that_weekday() {
        let mondays = rule("FREQ=WEEKLY;BYDAY=MO");
        let ny = tz("America/New_York");
        // Feb 17, 2026 is a Tuesday; Feb 23 is the following Monday.
        assert!(!is_due_on(&mondays, ny, day(2026, 2, 17)).unwrap());
        assert!(is_due_on(&mondays, ny, day(2026, 2, 23)).unwrap());
    }

    #[test]
    fn monthly_day_31_skips_short_months() {
        let thirty_first = rule("FREQ=MONTHLY;BYMONTHDAY=31");
        let utc = tz("UTC");
        // April has 30 days — no occurrence, no error.
        assert!(!is_due_on(&thirty_first, utc, day(2026, 4, 30)).unwrap());
        assert!(!is_due_on(&thirty_first, utc, day(2026, 4, 15)).unwrap());
        // March 31 exists.
        assert!(is_due_on(&thirty_first, utc, day(2026, 3, 31)).unwrap());
    }

    #[test]
    fn yearly_feb_29_only_matches_leap_years() {
        let leap = rule("FREQ=YEARLY;BYMONTHDAY=29;BYMONTH=2");
        let utc = tz("UTC");
        assert!(is_due_on(&leap, utc, day(2028, 2, 29)).unwrap());
        assert!(!is_due_on(&leap, utc, day(2026, 2, 28)).unwrap());
    }

    #[test]
    fn result_is_zone_sensitive() {
        let mondays = rule("FREQ=WEEKLY;BYDAY=MO");
        // The same calendar day query in two zones gives the same answer —
        // the day is already local. Feb 23, 2026 is a Monday everywhere.
        assert!(is_due_on(&mondays, tz("Pacific/Auckland"), day(2026, 2, 23)).unwrap());
        assert!(is_due_on(&mondays, tz("America/Los_Angeles"), day(2026, 2, 23)).unwrap());
    }

    #[test]
    fn weekly_byday_across_dst_transition() {
        // March 8, 2026 is the US spring-forward Sunday.
        let sundays = rule("FREQ=WEEKLY;BYDAY=SU");
        let ny = tz("America/New_York");
        assert!(is_due_on(&sundays, ny, day(2026, 3, 8)).unwrap());
        assert!(!is_due_on(&sundays, ny, day(2026, 3, 9)).unwrap());
    }

    #[test]
    fn unsupported_rule_fails_loudly() {
        let normalized = normalize("FREQ=HOURLY", &AliasTables::default()).unwrap();
        let err = evaluate(&normalized, tz("UTC"), day(2026, 2, 18)).unwrap_err();
        assert!(err.to_string().contains("Evaluation error"), "got: {err}");
    }

    #[test]
    fn valid_rule_evaluates_through_outcome() {
        let normalized = normalize("daily", &AliasTables::default()).unwrap();
        assert!(evaluate(&normalized, tz("UTC"), day(2026, 2, 18)).unwrap());
    }
}
