//! Accumulative Swing Index (ASI).
//!
//! For today's (O, H, L, C) and yesterday's (Oy, Hy, Ly, Cy):
//!
//! ```text
//! K  = max(Hy - C, Ly - C)
//! R  = branch on the largest of H-Cy, L-Cy, H-L (earlier candidate wins ties)
//! T  = Cy * t_percent
//! SI = 50 * ((Cy - C) + 0.5(Cy - Oy) + 0.25(C - O)) / R * K / T
//! ASI[t] = ASI[t-1] + SI, ASI starts at 0.0
//! ```
//!
//! SI is 0 when R or T is 0. Minimum period: 2 bars.

use crate::domain::indicator::{Indicator, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_T_PERCENT: f64 = 0.02;

/// Range term R for the swing index.
///
/// The three candidates are compared in order `H-Cy`, `L-Cy`, `H-L`; when two
/// share the maximum the earlier one selects the branch.
pub fn range_value(high: f64, low: f64, prev_close: f64, prev_open: f64) -> f64 {
    let up = high - prev_close;
    let down = low - prev_close;
    let span = high - low;
    let carry = 0.25 * (prev_close - prev_open);

    if up >= down && up >= span {
        up - 0.5 * down + carry
    } else if down >= span {
        down - 0.5 * up + carry
    } else {
        span + carry
    }
}

/// Incremental swing index between two consecutive bars.
pub fn swing_index(today: &OhlcvBar, yesterday: &OhlcvBar, t_percent: f64) -> f64 {
    let (o, h, l, c) = (today.open, today.high, today.low, today.close);
    let (oy, hy, ly, cy) = (yesterday.open, yesterday.high, yesterday.low, yesterday.close);

    let k = (hy - c).max(ly - c);
    let r = range_value(h, l, cy, oy);
    let t = cy * t_percent;

    if r == 0.0 || t == 0.0 {
        return 0.0;
    }

    let numerator = (cy - c) + 0.5 * (cy - oy) + 0.25 * (c - o);
    50.0 * (numerator / r) * (k / t)
}

#[derive(Debug, Clone)]
pub struct AccumulativeSwingIndex {
    t_percent: f64,
    prev_bar: Option<OhlcvBar>,
    cumulative: f64,
    previous: f64,
    ready: bool,
}

impl AccumulativeSwingIndex {
    pub fn new(t_percent: f64) -> Self {
        AccumulativeSwingIndex {
            t_percent,
            prev_bar: None,
            cumulative: 0.0,
            previous: 0.0,
            ready: false,
        }
    }

    pub fn t_percent(&self) -> f64 {
        self.t_percent
    }

    /// Cumulative value before the latest bar was applied.
    pub fn previous(&self) -> f64 {
        self.previous
    }
}

impl Default for AccumulativeSwingIndex {
    fn default() -> Self {
        AccumulativeSwingIndex::new(DEFAULT_T_PERCENT)
    }
}

impl Indicator for AccumulativeSwingIndex {
    fn update(&mut self, bar: &OhlcvBar) -> Option<f64> {
        if let Some(yesterday) = self.prev_bar.as_ref() {
            let si = swing_index(bar, yesterday, self.t_percent);
            self.previous = self.cumulative;
            self.cumulative += si;
            self.ready = true;
        }
        self.prev_bar = Some(bar.clone());
        self.value()
    }

    fn value(&self) -> Option<f64> {
        self.ready.then_some(self.cumulative)
    }

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Asi {
            t_percent: self.t_percent,
        }
    }
}
