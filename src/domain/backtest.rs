//! Single-instrument backtest loop.
//!
//! Per bar: settle the queued order → sync position → strategy decision →
//! submit. Each run owns its broker and strategy.

use chrono::NaiveDate;
use tracing::info_span;

use super::broker::SimulatedBroker;
use super::error::DcaError;
use super::ohlcv::OhlcvBar;
use super::strategy::{DcaStrategy, StrategyConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Percent of trade value.
    pub commission_pct: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub parallel: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 1_000_000.0,
            commission_pct: 0.1,
            start_date: None,
            end_date: None,
            parallel: true,
        }
    }
}

/// Outcome of one (ticker, strategy) run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub ticker: String,
    pub strategy: String,
    pub bars: usize,
    pub initial_capital: f64,
    pub final_cash: f64,
    pub units: f64,
    pub invested: f64,
    pub commission_paid: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub buys: usize,
    pub failed_orders: usize,
    pub average_entry_price: f64,
    pub lowest_entry: Option<f64>,
    pub unrealized_pnl: f64,
    pub last_close: f64,
}

impl RunResult {
    pub fn total_return_pct(&self) -> f64 {
        self.total_return * 100.0
    }
}

pub fn run_backtest(
    ticker: &str,
    bars: &[OhlcvBar],
    strategy_config: &StrategyConfig,
    config: &BacktestConfig,
) -> Result<RunResult, DcaError> {
    let _span = info_span!("run_backtest", ticker = %ticker, strategy = %strategy_config.name)
        .entered();

    let last_bar = bars.last().ok_or_else(|| DcaError::NoData {
        ticker: ticker.to_string(),
    })?;

    let mut strategy = DcaStrategy::new(strategy_config.clone())?;
    let mut broker = SimulatedBroker::new(config.initial_capital, config.commission_pct);

    for bar in bars {
        for notification in broker.process_pending(bar) {
            strategy.notify_order(&notification);
        }
        strategy.sync_position(broker.units());

        let state = broker.state(bar.close);
        if let Some(intent) = strategy.on_bar(bar, &state) {
            let ack = broker.submit(&intent, bar);
            strategy.notify_order(&ack);
        }
    }

    let last_close = last_bar.close;
    let final_value = broker.portfolio_value(last_close);
    let total_return = if config.initial_capital > 0.0 {
        (final_value - config.initial_capital) / config.initial_capital
    } else {
        0.0
    };
    let book = strategy.entries();

    let result = RunResult {
        ticker: ticker.to_string(),
        strategy: strategy.name().to_string(),
        bars: bars.len(),
        initial_capital: config.initial_capital,
        final_cash: broker.cash(),
        units: broker.units(),
        invested: broker.invested(),
        commission_paid: broker.commission_paid(),
        final_value,
        total_return,
        buys: strategy.tracker().fills(),
        failed_orders: strategy.tracker().failures(),
        average_entry_price: book.weighted_average_price(),
        lowest_entry: book.lowest_entry(),
        unrealized_pnl: book.unrealized_pnl(last_close),
        last_close,
    };

    tracing::info!(
        buys = result.buys,
        failed = result.failed_orders,
        final_value = result.final_value,
        total_return_pct = result.total_return_pct(),
        "run complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::flat_bars;
    use approx::assert_abs_diff_eq;

    fn no_commission() -> BacktestConfig {
        BacktestConfig {
            initial_capital: 10_000.0,
            commission_pct: 0.0,
            ..BacktestConfig::default()
        }
    }

    #[test]
    fn empty_bars_is_no_data() {
        let err = run_backtest("AAPL", &[], &StrategyConfig::flat("DCA", 100.0, 3), &no_commission())
            .unwrap_err();
        assert!(matches!(err, DcaError::NoData { ticker } if ticker == "AAPL"));
    }

    #[test]
    fn invalid_strategy_fails_before_first_bar() {
        let bars = flat_bars(&[10.0; 5]);
        let err = run_backtest("AAPL", &bars, &StrategyConfig::flat("DCA", 100.0, 0), &no_commission())
            .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn flat_dca_on_constant_price() {
        // buys submitted on days 1, 5, 9: each fill lands a day later and the
        // cadence restarts from the fill date
        let bars = flat_bars(&[10.0; 10]);
        let result = run_backtest("AAPL", &bars, &StrategyConfig::flat("DCA", 100.0, 3), &no_commission())
            .unwrap();

        assert_eq!(result.buys, 3);
        assert_eq!(result.failed_orders, 0);
        assert_abs_diff_eq!(result.units, 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.invested, 300.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.final_cash, 9_700.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.final_value, 10_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.average_entry_price, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.unrealized_pnl, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn commission_reduces_cash() {
        let bars = flat_bars(&[10.0; 3]);
        let config = BacktestConfig {
            commission_pct: 0.1,
            ..no_commission()
        };
        let result = run_backtest("AAPL", &bars, &StrategyConfig::flat("DCA", 100.0, 30), &config).unwrap();
        assert_eq!(result.buys, 1);
        assert_abs_diff_eq!(result.commission_paid, 0.1, epsilon = 1e-9);
        assert_abs_diff_eq!(result.final_cash, 10_000.0 - 100.0 - 0.1, epsilon = 1e-9);
    }

    #[test]
    fn capped_last_buy_settles_with_commission() {
        let bars = flat_bars(&[3.709; 20]);
        let config = BacktestConfig {
            initial_capital: 101.0,
            commission_pct: 0.1,
            ..no_commission()
        };
        let result = run_backtest("AAPL", &bars, &StrategyConfig::flat("DCA", 100.0, 1), &config).unwrap();

        assert_eq!(result.buys, 2);
        assert_eq!(result.failed_orders, 0);
        assert_eq!(result.final_cash, 0.0);
        assert_abs_diff_eq!(result.invested + result.commission_paid, 101.0, epsilon = 1e-9);
    }
}
