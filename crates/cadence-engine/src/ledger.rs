//! Day-bucketed coin-ledger aggregation.
//!
//! The engine does not own the transaction list — it only sums it. Bucketing
//! goes through [`crate::time::local_day`], the same primitive the schedule
//! predicates use, so "earned today" and "due today" agree on what "today"
//! means.

use serde::{Deserialize, Serialize};

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    HabitComplete,
    HabitUndo,
    TaskComplete,
    Purchase,
    Adjustment,
}

/// One ledger entry, consumed read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinTransaction {
    /// RFC 3339 instant string, UTC at rest.
    pub timestamp: String,
    /// Signed coin amount.
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
}

fn on_day(tx: &CoinTransaction, day: NaiveDate, tz: Tz) -> bool {
    time::parse_instant(&tx.timestamp)
        .map(|instant| time::local_day(instant, tz) == day)
        .unwrap_or(false)
}

/// Net coins earned on `day` in `tz`.
///
/// Positive amounts count, and so does every `HABIT_UNDO` amount regardless
/// of sign: an undo reverses an earlier reward, so its (negative) amount
/// belongs to the earned total, never to spending.
pub fn earned_on(transactions: &[CoinTransaction], day: NaiveDate, tz: Tz) -> i64 {
    transactions
        .iter()
        .filter(|tx| on_day(tx, day, tz))
        .filter(|tx| tx.amount > 0 || tx.kind == TransactionKind::HabitUndo)
        .map(|tx| tx.amount)
        .sum()
}

/// Coins spent on `day` in `tz`, as a positive total.
///
/// Only negative non-undo amounts count; `HABIT_UNDO` is excluded regardless
/// of sign.
pub fn spent_on(transactions: &[CoinTransaction], day: NaiveDate, tz: Tz) -> i64 {
    transactions
        .iter()
        .filter(|tx| on_day(tx, day, tz))
        .filter(|tx| tx.amount < 0 && tx.kind != TransactionKind::HabitUndo)
        .map(|tx| -tx.amount)
        .sum()
}

// ── Tests ───────────────────────────────────────────────────────────────────
