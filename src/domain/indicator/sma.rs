//! Simple Moving Average over a rolling window.
//!
//! SMA(n) = sum(x[i-j] for j in 0..n) / n, maintained with a running sum.
//! Warmup: first (n-1) bars produce no value.

use std::collections::VecDeque;

use crate::domain::indicator::{Indicator, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

/// Which bar field the average is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Close,
    Volume,
}

impl ValueSource {
    fn extract(self, bar: &OhlcvBar) -> f64 {
        match self {
            ValueSource::Close => bar.close,
            ValueSource::Volume => bar.volume,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    source: ValueSource,
    window: VecDeque<f64>,
    sum: f64,
}

impl Sma {
    pub fn new(period: usize, source: ValueSource) -> Self {
        Sma {
            period: period.max(1),
            source,
            window: VecDeque::with_capacity(period.max(1)),
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.window.push_back(value);
        self.sum += value;
        if self.window.len() > self.period {
            if let Some(old) = self.window.pop_front() {
                self.sum -= old;
            }
        }
        self.current()
    }

    fn current(&self) -> Option<f64> {
        if self.window.len() == self.period {
            Some(self.sum / self.period as f64)
        } else {
            None
        }
    }
}

impl Indicator for Sma {
    fn update(&mut self, bar: &OhlcvBar) -> Option<f64> {
        self.push(self.source.extract(bar))
    }

    fn value(&self) -> Option<f64> {
        self.current()
    }

    fn indicator_type(&self) -> IndicatorType {
        match self.source {
            ValueSource::Close => IndicatorType::Sma(self.period),
            ValueSource::Volume => IndicatorType::VolumeSma(self.period),
        }
    }
}
