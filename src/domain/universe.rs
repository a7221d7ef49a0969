//! Multi-instrument runs.
//!
//! Bars are loaded once per ticker through the data port, then every
//! (ticker, strategy) pair runs as an independent job. Jobs share nothing; results
//! are merged only after all of them finish.

use crate::domain::backtest::{run_backtest, BacktestConfig, RunResult};
use crate::domain::error::DcaError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::strategy::StrategyConfig;
use crate::ports::data_port::DataPort;
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::info_span;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UniverseReport {
    /// Sorted by ticker, then strategy name.
    pub results: Vec<RunResult>,
    pub skipped: Vec<SkippedTicker>,
}

impl UniverseReport {
    pub fn total_invested(&self) -> f64 {
        self.results.iter().map(|r| r.invested).sum()
    }

    pub fn total_buys(&self) -> usize {
        self.results.iter().map(|r| r.buys).sum()
    }
}

struct Job<'a> {
    ticker: &'a str,
    bars: &'a [OhlcvBar],
    strategy: &'a StrategyConfig,
}

/// Load every ticker, then run each strategy against each one.
///
/// Tickers that fail to load are skipped with a warning; if none load, the run
/// fails with `NoData`.
pub fn run_universe(
    data_port: &dyn DataPort,
    tickers: &[String],
    strategies: &[StrategyConfig],
    config: &BacktestConfig,
) -> Result<UniverseReport, DcaError> {
    let _span = info_span!(
        "run_universe",
        tickers = tickers.len(),
        strategies = strategies.len(),
        parallel = config.parallel
    )
    .entered();

    let mut loaded: Vec<(String, Vec<OhlcvBar>)> = Vec::new();
    let mut skipped = Vec::new();

    for ticker in tickers {
        match data_port.fetch_bars(ticker, config.start_date, config.end_date) {
            Ok(bars) if !bars.is_empty() => {
                tracing::info!(ticker = %ticker, bars = bars.len(), "loaded");
                loaded.push((ticker.clone(), bars));
            }
            Ok(_) => {
                tracing::warn!(ticker = %ticker, "skipping: no bars in range");
                skipped.push(SkippedTicker {
                    ticker: ticker.clone(),
                    reason: "no bars in range".to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(ticker = %ticker, error = %e, "skipping");
                skipped.push(SkippedTicker {
                    ticker: ticker.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if loaded.is_empty() {
        return Err(DcaError::NoData {
            ticker: tickers.join(","),
        });
    }

    let jobs: Vec<Job<'_>> = loaded
        .iter()
        .flat_map(|(ticker, bars)| {
            strategies.iter().map(move |strategy| Job {
                ticker: ticker.as_str(),
                bars: bars.as_slice(),
                strategy,
            })
        })
        .collect();

    let run = |job: &Job<'_>| run_backtest(job.ticker, job.bars, job.strategy, config);
    let mut results: Vec<RunResult> = if config.parallel {
        jobs.par_iter().map(run).collect::<Result<Vec<_>, _>>()?
    } else {
        jobs.iter().map(run).collect::<Result<Vec<_>, _>>()?
    };

    results.sort_by(|a, b| {
        a.ticker
            .cmp(&b.ticker)
            .then_with(|| a.strategy.cmp(&b.strategy))
    });

    Ok(UniverseReport { results, skipped })
}
