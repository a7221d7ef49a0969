#![allow(dead_code)]

use chrono::NaiveDate;
use dcatrader::domain::backtest::BacktestConfig;
use dcatrader::domain::error::DcaError;
pub use dcatrader::domain::ohlcv::OhlcvBar;
use dcatrader::domain::strategy::StrategyConfig;
use dcatrader::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, DcaError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(DcaError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(ticker).ok_or_else(|| DcaError::NoData {
            ticker: ticker.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| start_date.is_none_or(|s| b.date() >= s))
            .filter(|b| end_date.is_none_or(|e| b.date() <= e))
            .cloned()
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, DcaError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date_str: &str, close: f64) -> OhlcvBar {
    make_ohlc_bar(date_str, close, close + 1.0, close - 1.0, close, 1000.0)
}

pub fn make_ohlc_bar(date_str: &str, open: f64, high: f64, low: f64, close: f64, volume: f64) -> OhlcvBar {
    OhlcvBar {
        timestamp: NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
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

/// One bar per calendar day following `closes`.
pub fn bars_from_closes(start_date: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            timestamp: (start + chrono::Duration::days(i as i64))
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: close,
            high: close + 1.0,
            low: (close - 1.0).max(0.01),
            close,
            volume: 1000.0 + (i % 7) as f64 * 150.0,
        })
        .collect()
}

/// Deterministic zig-zag around a drifting mean.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| {
            let wave = ((i % 10) as f64 - 5.0).abs() * 0.8;
            start_price + i as f64 * 0.05 - wave
        })
        .collect();
    bars_from_closes(start_date, &closes)
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        initial_capital: 100_000.0,
        commission_pct: 0.0,
        start_date: None,
        end_date: None,
        parallel: false,
    }
}

pub fn flat_strategy() -> StrategyConfig {
    StrategyConfig::flat("DCA", 100.0, 3)
}
