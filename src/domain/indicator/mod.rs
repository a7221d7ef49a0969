//! Technical indicator implementations.
//!
//! Every indicator is an incremental accumulator: it is fed one bar at a time via
//! [`Indicator::update`] and keeps only the window it needs. `None` means the
//! indicator is still warming up.
//!
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSet`: the bundle of rolling inputs consumed by the signal evaluator

pub mod asi;
pub mod atr;
pub mod sma;
pub mod stddev;

use crate::domain::ohlcv::OhlcvBar;
use std::fmt;

pub use asi::AccumulativeSwingIndex;
pub use atr::Atr;
pub use sma::{Sma, ValueSource};
pub use stddev::StdDev;

pub trait Indicator {
    /// Feed the next bar and return the current value, if warm.
    fn update(&mut self, bar: &OhlcvBar) -> Option<f64>;

    /// Latest value without feeding a bar.
    fn value(&self) -> Option<f64>;

    fn indicator_type(&self) -> IndicatorType;
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorType {
    Sma(usize),
    VolumeSma(usize),
    Stddev(usize),
    Atr(usize),
    Asi { t_percent: f64 },
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::VolumeSma(period) => write!(f, "VOLUME_SMA({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Asi { t_percent } => write!(f, "ASI({})", t_percent),
        }
    }
}

/// Lookback windows for the rolling inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPeriods {
    pub sma: usize,
    pub stddev: usize,
    pub volume: usize,
    pub atr: usize,
    pub t_percent: f64,
}

impl Default for IndicatorPeriods {
    fn default() -> Self {
        IndicatorPeriods {
            sma: 30,
            stddev: 30,
            volume: 30,
            atr: 14,
            t_percent: 0.02,
        }
    }
}

/// Snapshot of all rolling inputs after the latest bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorReadings {
    pub sma: f64,
    pub stddev: f64,
    pub avg_volume: f64,
    pub atr: f64,
    pub asi: f64,
    pub asi_prev: f64,
}

/// All rolling indicators owned by one strategy instance, updated once per bar.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub sma: Sma,
    pub stddev: StdDev,
    pub avg_volume: Sma,
    pub atr: Atr,
    pub asi: AccumulativeSwingIndex,
}

impl IndicatorSet {
    pub fn new(periods: &IndicatorPeriods) -> Self {
        IndicatorSet {
            sma: Sma::new(periods.sma, ValueSource::Close),
            stddev: StdDev::new(periods.stddev),
            avg_volume: Sma::new(periods.volume, ValueSource::Volume),
            atr: Atr::new(periods.atr),
            asi: AccumulativeSwingIndex::new(periods.t_percent),
        }
    }

    pub fn update(&mut self, bar: &OhlcvBar) {
        self.sma.update(bar);
        self.stddev.update(bar);
        self.avg_volume.update(bar);
        self.atr.update(bar);
        self.asi.update(bar);
    }

    /// Readings once every indicator is warm.
    pub fn readings(&self) -> Option<IndicatorReadings> {
        Some(IndicatorReadings {
            sma: self.sma.value()?,
            stddev: self.stddev.value()?,
            avg_volume: self.avg_volume.value()?,
            atr: self.atr.value()?,
            asi: self.asi.value()?,
            asi_prev: self.asi.previous(),
        })
    }

    pub fn types(&self) -> Vec<IndicatorType> {
        vec![
            self.sma.indicator_type(),
            self.stddev.indicator_type(),
            self.avg_volume.indicator_type(),
            self.atr.indicator_type(),
            self.asi.indicator_type(),
        ]
    }
}

#[cfg(test)]
pub(crate) mod test_bars {
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::NaiveDate;

    pub fn bar(day: u32, open: f64, high: f64, low: f64, close: f64, volume: f64) -> OhlcvBar {
        OhlcvBar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn flat_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| bar((i + 1) as u32, close, close, close, close, 1000.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_bars::bar;

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::Sma(30).to_string(), "SMA(30)");
        assert_eq!(IndicatorType::VolumeSma(30).to_string(), "VOLUME_SMA(30)");
        assert_eq!(IndicatorType::Atr(14).to_string(), "ATR(14)");
        assert_eq!(
            IndicatorType::Asi { t_percent: 0.02 }.to_string(),
            "ASI(0.02)"
        );
        assert_eq!(IndicatorType::Asi { t_percent: 0.015 }.to_string(), "ASI(0.015)");
    }

    #[test]
    fn readings_wait_for_slowest_indicator() {
        let periods = IndicatorPeriods {
            sma: 3,
            stddev: 3,
            volume: 3,
            atr: 3,
            t_percent: 0.02,
        };
        let mut set = IndicatorSet::new(&periods);

        // ATR(3) needs four bars: three true ranges after the first close.
        for day in 1..=3 {
            set.update(&bar(day, 10.0, 11.0, 9.0, 10.0, 100.0));
            assert!(set.readings().is_none());
        }
        set.update(&bar(4, 10.0, 11.0, 9.0, 10.0, 100.0));
        let readings = set.readings().unwrap();
        assert!((readings.sma - 10.0).abs() < f64::EPSILON);
        assert!((readings.avg_volume - 100.0).abs() < f64::EPSILON);
        assert!((readings.atr - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn types_lists_every_indicator() {
        let set = IndicatorSet::new(&IndicatorPeriods::default());
        let names: Vec<String> = set.types().iter().map(|t| t.to_string()).collect();
        assert_eq!(
            names,
            vec!["SMA(30)", "STDDEV(30)", "VOLUME_SMA(30)", "ATR(14)", "ASI(0.02)"]
        );
    }
}
