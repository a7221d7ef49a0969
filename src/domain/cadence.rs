//! Cadence gate: minimum elapsed calendar days between buys.

use chrono::NaiveDate;

/// True when no buy has happened yet or at least `period_days` whole days have passed.
pub fn is_entry_due(current: NaiveDate, last_buy: Option<NaiveDate>, period_days: i64) -> bool {
    match last_buy {
        None => true,
        Some(last) => (current - last).num_days() >= period_days,
    }
}
