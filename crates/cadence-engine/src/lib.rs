//! # cadence-engine
//!
//! Timezone-correct due-date engine for recurring habits and one-off tasks.
//!
//! Given a compact stored representation — an RFC-5545-style recurrence rule
//! string for a habit, or a single due instant for a task — the engine
//! answers whether the item is due on a given local calendar day, whether it
//! is overdue, and how its schedule should be displayed. Calendar arithmetic
//! is always done in the caller's IANA timezone; the only non-deterministic
//! input is the `now` anchor, which callers supply explicitly.
//!
//! ## Modules
//!
//! - [`time`] — instant ↔ zoned-day conversions, day boundaries, the shared same-day primitive
//! - [`rule`] — rule normalization: aliases, strict grammar, natural-language recurrence, sub-daily rejection
//! - [`nldate`] — natural-language due-date phrases for one-off tasks
//! - [`occurrence`] — single-day occurrence evaluation over canonical rules
//! - [`schedule`] — habit-level predicates: due, completed, overdue, frequency bucket, display text
//! - [`ledger`] — day-bucketed coin-transaction sums (collaborator surface)
//! - [`error`] — error types

pub mod error;
pub mod ledger;
pub mod nldate;
pub mod occurrence;
pub mod rule;
pub mod schedule;
pub mod time;

pub use error::CadenceError;
pub use ledger::{earned_on, spent_on, CoinTransaction, TransactionKind};
pub use nldate::resolve_due_phrase;
pub use occurrence::{evaluate, is_due_on};
pub use rule::{
    normalize, normalize_natural, AliasTables, CanonicalRule, FrequencyClass, Normalized,
};
pub use schedule::{
    completions_on, display_text, due_on, due_today, frequency_class, is_completed, is_overdue,
    progress, Due, Habit, Schedule,
};
pub use time::{local_day, same_calendar_day, today_in};
