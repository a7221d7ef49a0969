//! Standard Deviation indicator.
//!
//! Population standard deviation over n closing prices.
//! STDDEV(n) = sqrt(mean(C^2) - mean(C)^2) over the trailing window.
//! Warmup: first (n-1) bars produce no value.

use std::collections::VecDeque;

use crate::domain::indicator::{Indicator, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
    sum_sq: f64,
}

impl StdDev {
    pub fn new(period: usize) -> Self {
        StdDev {
            period: period.max(1),
            window: VecDeque::with_capacity(period.max(1)),
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    fn current(&self) -> Option<f64> {
        if self.window.len() < self.period {
            return None;
        }
        let n = self.period as f64;
        let mean = self.sum / n;
        // Running sums can drift a hair below zero on constant input.
        let variance = (self.sum_sq / n - mean * mean).max(0.0);
        Some(variance.sqrt())
    }
}

impl Indicator for StdDev {
    fn update(&mut self, bar: &OhlcvBar) -> Option<f64> {
        let close = bar.close;
        self.window.push_back(close);
        self.sum += close;
        self.sum_sq += close * close;
        if self.window.len() > self.period {
            if let Some(old) = self.window.pop_front() {
                self.sum -= old;
                self.sum_sq -= old * old;
            }
        }
        self.current()
    }

    fn value(&self) -> Option<f64> {
        self.current()
    }

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Stddev(self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::flat_bars;

    fn run(prices: &[f64], period: usize) -> Vec<Option<f64>> {
        let mut sd = StdDev::new(period);
        flat_bars(prices).iter().map(|b| sd.update(b)).collect()
    }

    #[test]
    fn stddev_warmup() {
        let values = run(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);

        assert!(values[0].is_none());
        assert!(values[1].is_none());
        assert!(values[2].is_some());
        assert!(values[3].is_some());
        assert!(values[4].is_some());
    }

    #[test]
    fn stddev_constant_values() {
        let values = run(&[100.0, 100.0, 100.0, 100.0, 100.0], 3);
        assert!(values[4].unwrap().abs() < 1e-9);
    }

    #[test]
    fn stddev_basic_calculation() {
        let values = run(&[10.0, 20.0, 30.0], 3);

        let sma: f64 = (10.0 + 20.0 + 30.0) / 3.0;
        let expected: f64 =
            ((10.0 - sma).powi(2) + (20.0 - sma).powi(2) + (30.0 - sma).powi(2)) / 3.0;
        assert!((values[2].unwrap() - expected.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn stddev_known_values() {
        let values = run(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        assert!((values[7].unwrap() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn stddev_indicator_type() {
        assert_eq!(StdDev::new(5).indicator_type(), IndicatorType::Stddev(5));
    }
}
