//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), defined from the
//! second bar on. ATR uses Wilder smoothing seeded with the mean of the first
//! `period` true ranges: ATR[t] = (ATR[t-1] * (n-1) + TR[t]) / n.
//! Warmup: period + 1 bars.

use crate::domain::indicator::{Indicator, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    seed_sum: f64,
    seed_count: usize,
    atr: Option<f64>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Atr {
            period: period.max(1),
            prev_close: None,
            seed_sum: 0.0,
            seed_count: 0,
            atr: None,
        }
    }
}

impl Indicator for Atr {
    fn update(&mut self, bar: &OhlcvBar) -> Option<f64> {
        let prev_close = self.prev_close.replace(bar.close)?;
        let tr = bar.true_range(prev_close);
        let n = self.period as f64;

        self.atr = match self.atr {
            Some(prev) => Some((prev * (n - 1.0) + tr) / n),
            None => {
                self.seed_sum += tr;
                self.seed_count += 1;
                if self.seed_count == self.period {
                    Some(self.seed_sum / n)
                } else {
                    None
                }
            }
        };
        self.atr
    }

    fn value(&self) -> Option<f64> {
        self.atr
    }

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Atr(self.period)
    }
}
