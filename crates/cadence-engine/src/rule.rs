//! Recurrence rule normalization.
//!
//! Turns raw input — a stored RFC-5545-style rule string, an alias keyword,
//! or (in natural-language mode) free text like "every 2 weeks" — into a
//! canonical [`CanonicalRule`], or into the explicit [`Normalized::Unsupported`]
//! marker. Sub-daily frequencies (hourly, minutely, secondly) are always
//! unsupported: they may parse, but they never reach the evaluator.
//!
//! Malformed input is a real error ([`CadenceError::InvalidRule`]), never a
//! silent `Unsupported` — rule-authoring flows need to reject bad input,
//! while schedule evaluation catches and degrades at its own boundary.

use std::collections::HashMap;
use std::fmt;

use chrono::Weekday;
use rrule::{Frequency, NWeekday, RRule, Unvalidated};
use serde::{Deserialize, Serialize};

use crate::error::CadenceError;
use crate::nldate::{normalize_phrase, parse_weekday};

/// Stored form of an unsupported rule. Normalizing it yields
/// [`Normalized::Unsupported`] again.
pub const INVALID_SENTINEL: &str = "INVALID";

// ── Frequency classification ────────────────────────────────────────────────

/// Canonical frequency bucket of a supported rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyClass {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl FrequencyClass {
    /// Supported buckets only; sub-daily frequencies map to `None`.
    fn from_freq(freq: Frequency) -> Option<Self> {
        match freq {
            Frequency::Daily => Some(Self::Daily),
            Frequency::Weekly => Some(Self::Weekly),
            Frequency::Monthly => Some(Self::Monthly),
            Frequency::Yearly => Some(Self::Yearly),
            Frequency::Hourly | Frequency::Minutely | Frequency::Secondly => None,
        }
    }

    fn unit(self) -> &'static str {
        match self {
            Self::Daily => "day",
            Self::Weekly => "week",
            Self::Monthly => "month",
            Self::Yearly => "year",
        }
    }
}

impl fmt::Display for FrequencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        };
        f.write_str(name)
    }
}

// ── Canonical rule ──────────────────────────────────────────────────────────

/// A normalized, supported recurrence rule.
///
/// The anchor (dtstart) is deliberately absent: it is re-bound to the start
/// of the queried local day on every evaluation.
#[derive(Debug, Clone)]
pub struct CanonicalRule {
    rule: RRule<Unvalidated>,
    class: FrequencyClass,
}

impl CanonicalRule {
    pub fn class(&self) -> FrequencyClass {
        self.class
    }

    pub fn interval(&self) -> u16 {
        self.rule.get_interval()
    }

    pub fn by_weekday(&self) -> &[NWeekday] {
        self.rule.get_by_weekday()
    }

    pub fn by_month_day(&self) -> &[i8] {
        self.rule.get_by_month_day()
    }

    pub(crate) fn inner(&self) -> &RRule<Unvalidated> {
        &self.rule
    }

    /// Human-readable schedule text, e.g. "every day",
    /// "every 2 weeks on Monday, Thursday", "every month on day 15".
    pub fn describe(&self) -> String {
        let mut text = if self.interval() <= 1 {
            format!("every {}", self.class.unit())
        } else {
            format!("every {} {}s", self.interval(), self.class.unit())
        };

        let weekdays = self.by_weekday();
        if !weekdays.is_empty() {
            let names: Vec<String> = weekdays.iter().map(weekday_label).collect();
            text.push_str(" on ");
            text.push_str(&names.join(", "));
        }

        let month_days = self.by_month_day();
        if !month_days.is_empty() {
            let days: Vec<String> = month_days.iter().map(|d| d.to_string()).collect();
            text.push_str(" on day ");
            text.push_str(&days.join(", "));
        }

        text
    }
}

impl fmt::Display for CanonicalRule {
    /// Canonical serialization: frequency, interval, and by-constraints in a
    /// fixed order. Count/until bounds from the original input are not part
    /// of the canonical form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", freq_token(self.class))?;
        if self.interval() > 1 {
            write!(f, ";INTERVAL={}", self.interval())?;
        }
        if !self.by_weekday().is_empty() {
            let days: Vec<String> = self.by_weekday().iter().map(byday_token).collect();
            write!(f, ";BYDAY={}", days.join(","))?;
        }
        if !self.by_month_day().is_empty() {
            let days: Vec<String> =
                self.by_month_day().iter().map(|d| d.to_string()).collect();
            write!(f, ";BYMONTHDAY={}", days.join(","))?;
        }
        Ok(())
    }
}

fn freq_token(class: FrequencyClass) -> &'static str {
    match class {
        FrequencyClass::Daily => "DAILY",
        FrequencyClass::Weekly => "WEEKLY",
        FrequencyClass::Monthly => "MONTHLY",
        FrequencyClass::Yearly => "YEARLY",
    }
}

fn byday_token(nw: &NWeekday) -> String {
    let day = |wd: Weekday| match wd {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    };
    match nw {
        NWeekday::Every(wd) => day(*wd).to_string(),
        NWeekday::Nth(n, wd) => format!("{}{}", n, day(*wd)),
    }
}

impl PartialEq for CanonicalRule {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class
            && self.interval() == other.interval()
            && self.by_weekday() == other.by_weekday()
            && self.by_month_day() == other.by_month_day()
    }
}

fn weekday_label(nw: &NWeekday) -> String {
    match nw {
        NWeekday::Every(wd) => weekday_name(*wd).to_string(),
        NWeekday::Nth(n, wd) => format!("{} {}", ordinal_label(*n), weekday_name(*wd)),
    }
}

fn weekday_name(wd: Weekday) -> &'static str {
    match wd {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn ordinal_label(n: i16) -> String {
    match n {
        1 => "first".to_string(),
        2 => "second".to_string(),
        3 => "third".to_string(),
        4 => "fourth".to_string(),
        5 => "fifth".to_string(),
        -1 => "last".to_string(),
        other => format!("#{other}"),
    }
}

// ── Normalization outcome ───────────────────────────────────────────────────

/// Outcome of normalizing rule input that parsed at all.
///
/// Parse failures are a separate [`CadenceError::InvalidRule`]; `Unsupported`
/// is a legitimate (if degenerate) rule state that callers may store and
/// display, but that the evaluator refuses to expand.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Valid(CanonicalRule),
    Unsupported,
}

impl Normalized {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported)
    }

    /// Serialized form for storage. Re-normalizing it yields an equivalent
    /// outcome (same frequency, interval, and constraints; `Unsupported`
    /// stays `Unsupported`).
    pub fn to_stored_string(&self) -> String {
        match self {
            Self::Valid(rule) => rule.to_string(),
            Self::Unsupported => INVALID_SENTINEL.to_string(),
        }
    }
}

// ── Alias tables ────────────────────────────────────────────────────────────

/// Keyword tables consulted before parsing. External config owns the real
/// tables; the defaults here cover the common shorthands.
///
/// `rules` maps shorthand to canonical rule strings ("daily" → `FREQ=DAILY`).
/// `due_dates` maps task due-date keywords to phrases the natural-language
/// date parser understands ("next week" → "next monday").
///
/// Keys are normalized (lowercased, whitespace collapsed) on load so that
/// config entries match lookups regardless of casing or spacing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AliasTables {
    #[serde(deserialize_with = "normalized_key_map")]
    pub rules: HashMap<String, String>,
    #[serde(deserialize_with = "normalized_key_map")]
    pub due_dates: HashMap<String, String>,
}

fn normalized_key_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = HashMap::<String, String>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| (normalize_phrase(&key), value))
        .collect())
}

impl Default for AliasTables {
    fn default() -> Self {
        let rules = [
            ("daily", "FREQ=DAILY"),
            ("weekly", "FREQ=WEEKLY"),
            ("monthly", "FREQ=MONTHLY"),
            ("yearly", "FREQ=YEARLY"),
            ("weekdays", "FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR"),
            ("weekends", "FREQ=WEEKLY;BYDAY=SA,SU"),
        ];
        let due_dates = [
            ("eod", "today"),
            ("next week", "next monday"),
            ("weekend", "next saturday"),
        ];
        Self {
            rules: rules
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            due_dates: due_dates
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

// ── Normalization ───────────────────────────────────────────────────────────

/// Normalize a stored or authored rule string: alias substitution, then the
/// strict RFC-5545 grammar.
///
/// # Errors
///
/// Returns [`CadenceError::InvalidRule`] if the input is neither an alias,
/// the invalid sentinel, nor a parseable rule string.
pub fn normalize(input: &str, aliases: &AliasTables) -> Result<Normalized, CadenceError> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case(INVALID_SENTINEL) {
        return Ok(Normalized::Unsupported);
    }
    let key = normalize_phrase(trimmed);
    let effective = aliases
        .rules
        .get(&key)
        .map(String::as_str)
        .unwrap_or(trimmed);
    parse_strict(effective).map(classify)
}

/// Normalize rule input that may also be free text describing a recurrence
/// pattern ("every day", "every 2 weeks", "every monday and friday").
///
/// Tries the alias table and strict grammar first, then the phrase parser.
///
/// # Errors
///
/// Returns [`CadenceError::InvalidRule`] if nothing can interpret the input.
pub fn normalize_natural(input: &str, aliases: &AliasTables) -> Result<Normalized, CadenceError> {
    match normalize(input, aliases) {
        Ok(normalized) => Ok(normalized),
        Err(_) => match parse_recurrence_phrase(input) {
            Some(rule) => Ok(classify(rule)),
            None => Err(CadenceError::InvalidRule(format!(
                "cannot interpret recurrence input: '{}'",
                input.trim()
            ))),
        },
    }
}

fn parse_strict(input: &str) -> Result<RRule<Unvalidated>, CadenceError> {
    let body = input.strip_prefix("RRULE:").unwrap_or(input).trim();
    if body.is_empty() {
        return Err(CadenceError::InvalidRule("empty rule string".to_string()));
    }
    body.parse::<RRule<Unvalidated>>()
        .map_err(|e| CadenceError::InvalidRule(format!("'{}': {}", input, e)))
}

/// A syntactically valid rule with a sub-daily frequency is not an error —
/// it normalizes to the unsupported marker.
fn classify(rule: RRule<Unvalidated>) -> Normalized {
    match FrequencyClass::from_freq(rule.get_freq()) {
        Some(class) => Normalized::Valid(CanonicalRule { rule, class }),
        None => Normalized::Unsupported,
    }
}

// ── Natural-language recurrence phrases ─────────────────────────────────────

/// Parse phrases of the form "every <something>" (plus the bare adverbs
/// "daily", "hourly", …). Sub-daily units parse here and are rejected by
/// [`classify`] afterwards.
fn parse_recurrence_phrase(input: &str) -> Option<RRule<Unvalidated>> {
    let s = normalize_phrase(input);

    let rest = match s.strip_prefix("every ") {
        Some(rest) => rest.to_string(),
        None => match s.as_str() {
            "daily" => "day".to_string(),
            "weekly" => "week".to_string(),
            "monthly" => "month".to_string(),
            "yearly" | "annually" => "year".to_string(),
            "hourly" => "hour".to_string(),
            "minutely" => "minute".to_string(),
            _ => return None,
        },
    };

    // "other <unit>" → interval 2
    if let Some(unit) = rest.strip_prefix("other ") {
        let freq = unit_frequency(unit)?;
        return Some(RRule::new(freq).interval(2));
    }

    // "<N> <unit>" → interval N
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    if tokens.len() == 2 {
        if let (Ok(n), Some(freq)) = (tokens[0].parse::<u16>(), unit_frequency(tokens[1])) {
            if n == 0 {
                return None;
            }
            return Some(RRule::new(freq).interval(n));
        }
    }

    // Bare unit: "day", "week", …
    if let Some(freq) = unit_frequency(&rest) {
        return Some(RRule::new(freq));
    }

    // Weekday list: "monday", "mon and fri", "mon, wed, fri"
    let names = rest.replace(" and ", ",");
    let mut weekdays = Vec::new();
    for name in names.split(',') {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        weekdays.push(NWeekday::Every(parse_weekday(name)?));
    }
    if weekdays.is_empty() {
        return None;
    }
    Some(RRule::new(Frequency::Weekly).by_weekday(weekdays))
}

fn unit_frequency(word: &str) -> Option<Frequency> {
    match word {
        "day" | "days" => Some(Frequency::Daily),
        "week" | "weeks" => Some(Frequency::Weekly),
        "month" | "months" => Some(Frequency::Monthly),
        "year" | "years" => Some(Frequency::Yearly),
        "hour" | "hours" => Some(Frequency::Hourly),
        "minute" | "minutes" => Some(Frequency::Minutely),
        "second" | "seconds" => Some(Frequency::Secondly),
        _ => None,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn aliases() -> AliasTables {
        AliasTables::default()
    }

    fn valid(input: &str) -> CanonicalRule {
        match normalize(input, &aliases()).unwrap() {
            Normalized::Valid(rule) => rule,
            Normalized::Unsupported => panic!("expected valid rule for '{input}'"),
        }
    }

    #[test]
    fn alias_daily_becomes_canonical_rule() {
        let rule = valid("daily");
        assert_eq!(rule.class(), FrequencyClass::Daily);
        assert_eq!(rule.interval(), 1);
    }

    #[test]
    fn alias_weekdays_carries_byday() {
        let rule = valid("weekdays");
        assert_eq!(rule.class(), FrequencyClass::Weekly);
        assert_eq!(rule.by_weekday().len(), 5);
    }

    #[test]
    fn strict_grammar_parses() {
        let rule = valid("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,TH");
        assert_eq!(rule.class(), FrequencyClass::Weekly);
        assert_eq!(rule.interval(), 2);
        assert_eq!(rule.by_weekday().len(), 2);
    }

    #[test]
    fn rrule_prefix_is_accepted() {
        let rule = valid("RRULE:FREQ=MONTHLY;BYMONTHDAY=31");
        assert_eq!(rule.class(), FrequencyClass::Monthly);
        assert_eq!(rule.by_month_day(), &[31]);
    }

    #[test]
    fn malformed_input_is_a_parse_error_not_unsupported() {
        let err = normalize("FREQ=SOMETIMES", &aliases()).unwrap_err();
        assert!(err.to_string().contains("Invalid rule"), "got: {err}");

        let err = normalize("", &aliases()).unwrap_err();
        assert!(err.to_string().contains("Invalid rule"), "got: {err}");
    }

    #[test]
    fn sub_daily_frequencies_normalize_to_unsupported() {
        for input in ["FREQ=HOURLY", "FREQ=MINUTELY", "FREQ=SECONDLY;INTERVAL=30"] {
            let normalized = normalize(input, &aliases()).unwrap();
            assert!(normalized.is_unsupported(), "expected unsupported: {input}");
        }
    }

    #[test]
    fn invalid_sentinel_round_trips() {
        let normalized = normalize(INVALID_SENTINEL, &aliases()).unwrap();
        assert!(normalized.is_unsupported());
        let stored = normalized.to_stored_string();
        assert!(normalize(&stored, &aliases()).unwrap().is_unsupported());
    }

    #[test]
    fn serialization_round_trips() {
        for input in [
            "daily",
            "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,TH",
            "FREQ=MONTHLY;BYMONTHDAY=15",
            "FREQ=YEARLY",
        ] {
            let first = valid(input);
            let second = valid(&first.to_string());
            assert_eq!(first, second, "round trip changed '{input}'");
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let first = normalize("weekly", &aliases()).unwrap();
        let stored = first.to_stored_string();
        let second = normalize(&stored, &aliases()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn natural_phrase_every_day() {
        let normalized = normalize_natural("every day", &aliases()).unwrap();
        let Normalized::Valid(rule) = normalized else {
            panic!("expected valid");
        };
        assert_eq!(rule.class(), FrequencyClass::Daily);
    }

    #[test]
    fn natural_phrase_every_n_weeks() {
        let Normalized::Valid(rule) = normalize_natural("every 2 weeks", &aliases()).unwrap()
        else {
            panic!("expected valid");
        };
        assert_eq!(rule.class(), FrequencyClass::Weekly);
        assert_eq!(rule.interval(), 2);
    }

    #[test]
    fn natural_phrase_every_other_month() {
        let Normalized::Valid(rule) = normalize_natural("every other month", &aliases()).unwrap()
        else {
            panic!("expected valid");
        };
        assert_eq!(rule.class(), FrequencyClass::Monthly);
        assert_eq!(rule.interval(), 2);
    }

    #[test]
    fn natural_phrase_weekday_list() {
        let Normalized::Valid(rule) =
            normalize_natural("every monday and friday", &aliases()).unwrap()
        else {
            panic!("expected valid");
        };
        assert_eq!(rule.class(), FrequencyClass::Weekly);
        assert_eq!(rule.by_weekday().len(), 2);
    }

    #[test]
    fn natural_phrase_every_hour_is_unsupported() {
        let normalized = normalize_natural("every hour", &aliases()).unwrap();
        assert!(normalized.is_unsupported());
        let normalized = normalize_natural("hourly", &aliases()).unwrap();
        assert!(normalized.is_unsupported());
    }

    #[test]
    fn natural_gibberish_is_a_parse_error() {
        let err = normalize_natural("whenever I feel like it", &aliases()).unwrap_err();
        assert!(err.to_string().contains("Invalid rule"), "got: {err}");
    }

    #[test]
    fn describe_renders_schedule_text() {
        assert_eq!(valid("daily").describe(), "every day");
        assert_eq!(
            valid("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,TH").describe(),
            "every 2 weeks on Monday, Thursday"
        );
        assert_eq!(
            valid("FREQ=MONTHLY;BYMONTHDAY=15").describe(),
            "every month on day 15"
        );
    }

    #[test]
    fn alias_tables_load_from_external_config() {
        let json = r#"{
            "rules": { "each morning": "FREQ=DAILY" },
            "due_dates": { "soon": "in 3 days" }
        }"#;
        let tables: AliasTables = serde_json::from_str(json).unwrap();
        let Normalized::Valid(rule) = normalize("each morning", &tables).unwrap() else {
            panic!("expected valid");
        };
        assert_eq!(rule.class(), FrequencyClass::Daily);
    }

    #[test]
    fn config_alias_keys_match_regardless_of_case_and_spacing() {
        let json = r#"{
            "rules": { "Each  Morning": "FREQ=DAILY" },
            "due_dates": { "Next Week": "next monday" }
        }"#;
        let tables: AliasTables = serde_json::from_str(json).unwrap();
        let Normalized::Valid(rule) = normalize("each morning", &tables).unwrap() else {
            panic!("expected valid");
        };
        assert_eq!(rule.class(), FrequencyClass::Daily);
        assert_eq!(
            tables.due_dates.get("next week").map(String::as_str),
            Some("next monday")
        );
    }

    proptest! {
        #[test]
        fn round_trip_preserves_frequency_and_interval(
            class in prop_oneof![
                Just(FrequencyClass::Daily),
                Just(FrequencyClass::Weekly),
                Just(FrequencyClass::Monthly),
                Just(FrequencyClass::Yearly),
            ],
            interval in 1u16..=30,
        ) {
            let freq = match class {
                FrequencyClass::Daily => Frequency::Daily,
                FrequencyClass::Weekly => Frequency::Weekly,
                FrequencyClass::Monthly => Frequency::Monthly,
                FrequencyClass::Yearly => Frequency::Yearly,
            };
            let stored = classify(RRule::new(freq).interval(interval)).to_stored_string();
            let normalized = normalize(&stored, &AliasTables::default()).unwrap();
            let Normalized::Valid(rule) = normalized else {
                panic!("round trip lost a valid rule");
            };
            prop_assert_eq!(rule.class(), class);
            prop_assert_eq!(rule.interval(), interval);
        }
    }
}
