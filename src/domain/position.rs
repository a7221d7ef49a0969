//! Accumulated buy entries and cost-basis tracking.

use chrono::NaiveDate;

/// One confirmed buy fill.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub price: f64,
    pub size: f64,
    pub date: NaiveDate,
}

impl Entry {
    pub fn cost(&self) -> f64 {
        self.price * self.size
    }
}

/// All entries of the current position, plus the lowest fill price seen.
///
/// Invariant: every recorded entry has `size > 0`; the book is cleared only when the
/// position returns to exactly zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryBook {
    entries: Vec<Entry>,
    lowest_entry: Option<f64>,
}

impl EntryBook {
    pub fn new() -> Self {
        EntryBook::default()
    }

    /// Record a fill. Non-positive sizes are not entries and are ignored.
    pub fn record(&mut self, entry: Entry) -> bool {
        if entry.size.is_nan() || entry.size <= 0.0 {
            return false;
        }
        self.lowest_entry = Some(match self.lowest_entry {
            Some(low) if low <= entry.price => low,
            _ => entry.price,
        });
        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn lowest_entry(&self) -> Option<f64> {
        self.lowest_entry
    }

    pub fn total_size(&self) -> f64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.entries.iter().map(Entry::cost).sum()
    }

    /// Σ(price·size) / Σ(size), or 0.0 with no entries.
    pub fn weighted_average_price(&self) -> f64 {
        let total_size = self.total_size();
        if total_size > 0.0 {
            self.total_cost() / total_size
        } else {
            0.0
        }
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.total_size() * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.total_size() * (price - self.weighted_average_price())
    }

    /// Reset after the tracked position size returns to exactly zero.
    pub fn reset_if_flat(&mut self, position_size: f64) -> bool {
        if position_size == 0.0 {
            self.entries.clear();
            self.lowest_entry = None;
            true
        } else {
            false
        }
    }
}
