//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::BacktestConfig;
use crate::domain::config_validation::{
    parse_optional_date, read_bool, read_f64, read_i64, read_optional_f64, validate_backtest_config, validate_strategy,
};
use crate::domain::error::DcaError;
use crate::domain::indicator::{IndicatorPeriods, IndicatorSet};
use crate::domain::signal::DcaPolicy;
use crate::domain::sizing::AllocationConfig;
use crate::domain::strategy::StrategyConfig;
use crate::domain::universe::{parse_tickers, run_universe, UniverseReport};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

pub const LOG_ENV: &str = "DCATRADER_LOG";
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "dcatrader", about = "Adaptive dollar-cost-averaging backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every configured strategy against every ticker
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Strategy file; repeat to compare several. Defaults to [strategy] in --config
        #[arg(short, long)]
        strategy: Vec<PathBuf>,
        /// Run a single ticker instead of the configured list
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a strategy configuration
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// List tickers with a data file
    ListSymbols {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Install the fmt subscriber; filter from `DCATRADER_LOG`, default `info`.
pub fn init_tracing() -> Result<(), String> {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| format!("failed to install tracing subscriber: {err}"))
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            strategy,
            ticker,
            data_dir,
            dry_run,
        } => {
            let request = BacktestRequest {
                config_path: &config,
                strategy_paths: &strategy,
                ticker: ticker.as_deref(),
                data_dir: data_dir.as_deref(),
            };
            if dry_run {
                run_dry_run(&request)
            } else {
                run_backtest(&request)
            }
        }
        Command::Validate { strategy } => run_validate(&strategy),
        Command::ListSymbols { data_dir, config } => {
            run_list_symbols(data_dir.as_deref(), config.as_deref())
        }
    }
}

struct BacktestRequest<'a> {
    config_path: &'a Path,
    strategy_paths: &'a [PathBuf],
    ticker: Option<&'a str>,
    data_dir: Option<&'a Path>,
}

/// Everything a backtest needs, resolved and validated.
struct Plan {
    backtest: BacktestConfig,
    strategies: Vec<StrategyConfig>,
    tickers: Vec<String>,
    data_dir: PathBuf,
}

fn report(err: DcaError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, DcaError> {
    FileConfigAdapter::from_file(path)
}

fn prepare(request: &BacktestRequest<'_>) -> Result<Plan, DcaError> {
    eprintln!("Loading config from {}", request.config_path.display());
    let adapter = load_config(request.config_path)?;
    validate_backtest_config(&adapter)?;
    let backtest = build_backtest_config(&adapter)?;

    let strategies = if request.strategy_paths.is_empty() {
        vec![build_strategy_config(&adapter)?]
    } else {
        request
            .strategy_paths
            .iter()
            .map(|path| {
                eprintln!("Loading strategy from {}", path.display());
                build_strategy_config(&load_config(path)?)
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    let tickers = resolve_tickers(request.ticker, &adapter)?;
    let data_dir = resolve_data_dir(request.data_dir, &adapter);

    Ok(Plan {
        backtest,
        strategies,
        tickers,
        data_dir,
    })
}

fn run_backtest(request: &BacktestRequest<'_>) -> ExitCode {
    let plan = match prepare(request) {
        Ok(p) => p,
        Err(e) => return report(e),
    };

    eprintln!(
        "Running {} strateg{} over {} ticker{} from {}",
        plan.strategies.len(),
        if plan.strategies.len() == 1 { "y" } else { "ies" },
        plan.tickers.len(),
        if plan.tickers.len() == 1 { "" } else { "s" },
        plan.data_dir.display(),
    );

    let data_port = CsvAdapter::new(plan.data_dir.clone());
    match run_universe(&data_port, &plan.tickers, &plan.strategies, &plan.backtest) {
        Ok(universe) => {
            print_summary(&universe);
            ExitCode::SUCCESS
        }
        Err(e) => report(e),
    }
}

fn print_summary(universe: &UniverseReport) {
    for skipped in &universe.skipped {
        eprintln!("warning: skipped {} ({})", skipped.ticker, skipped.reason);
    }

    eprintln!("\n=== Results ===");
    let mut current: Option<&str> = None;
    for r in &universe.results {
        if current != Some(r.ticker.as_str()) {
            eprintln!("\n{} ({} bars, last close {:.2})", r.ticker, r.bars, r.last_close);
            current = Some(r.ticker.as_str());
        }
        let lowest = r
            .lowest_entry
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "-".to_string());
        eprintln!(
            "  {:<24} buys {:>4}  failed {:>3}  invested {:>12.2}  avg {:>9.2}  low {:>9}  uPnL {:>11.2}  value {:>14.2}  return {:>7.2}%",
            r.strategy,
            r.buys,
            r.failed_orders,
            r.invested,
            r.average_entry_price,
            lowest,
            r.unrealized_pnl,
            r.final_value,
            r.total_return_pct(),
        );
    }

    eprintln!(
        "\n{} runs, {} buys, {:.2} invested",
        universe.results.len(),
        universe.total_buys(),
        universe.total_invested()
    );
}

fn run_dry_run(request: &BacktestRequest<'_>) -> ExitCode {
    let plan = match prepare(request) {
        Ok(p) => p,
        Err(e) => return report(e),
    };
    eprintln!("Config validated successfully");

    eprintln!("\nBacktest:");
    eprintln!("  initial_capital: {:.2}", plan.backtest.initial_capital);
    eprintln!("  commission_pct:  {}", plan.backtest.commission_pct);
    eprintln!(
        "  range:           {} to {}",
        plan.backtest
            .start_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "first bar".into()),
        plan.backtest
            .end_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "last bar".into()),
    );
    eprintln!("  parallel:        {}", plan.backtest.parallel);
    eprintln!("  data_dir:        {}", plan.data_dir.display());
    eprintln!("  tickers:         {}", plan.tickers.join(", "));

    for strategy in &plan.strategies {
        describe_strategy(strategy);
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn describe_strategy(strategy: &StrategyConfig) {
    let alloc = &strategy.allocation;
    eprintln!("\nStrategy: {}", strategy.name);
    eprintln!("  policy:      {}", strategy.policy.name());
    eprintln!("  period_days: {}", strategy.period_days);
    match alloc.base_risk_percent {
        Some(pct) => eprintln!("  base amount: {}% of portfolio value", pct),
        None => eprintln!("  base amount: {:.2}", alloc.invest_amount),
    }
    eprintln!(
        "  bounds:      [{:.2}, {:.2}]{}",
        alloc.min_investment,
        alloc.max_investment,
        if alloc.whole_units { ", whole units" } else { "" }
    );
    match strategy.policy {
        DcaPolicy::Flat => {}
        DcaPolicy::Step { adjustment } => eprintln!("  adjustment:  {}", adjustment),
        DcaPolicy::MomentumInverse {
            max_increase,
            max_decrease,
        } => eprintln!("  window:      -{} / +{}", max_decrease, max_increase),
        DcaPolicy::MultiFactor { min_entry_distance } => {
            eprintln!("  min_entry_distance: {}%", min_entry_distance);
            let names: Vec<String> = IndicatorSet::new(&strategy.indicators)
                .types()
                .iter()
                .map(|t| t.to_string())
                .collect();
            eprintln!("  indicators:  {}", names.join(", "));
        }
    }
}

fn run_validate(strategy_path: &Path) -> ExitCode {
    eprintln!("Validating strategy: {}", strategy_path.display());
    let strategy = match load_config(strategy_path).and_then(|a| build_strategy_config(&a)) {
        Ok(s) => s,
        Err(e) => return report(e),
    };
    describe_strategy(&strategy);
    eprintln!("\nStrategy configuration is valid.");
    ExitCode::SUCCESS
}

fn run_list_symbols(data_dir: Option<&Path>, config_path: Option<&Path>) -> ExitCode {
    let dir = match (data_dir, config_path) {
        (Some(dir), _) => dir.to_path_buf(),
        (None, Some(path)) => match load_config(path) {
            Ok(config) => resolve_data_dir(None, &config),
            Err(e) => return report(e),
        },
        (None, None) => PathBuf::from(DEFAULT_DATA_DIR),
    };

    let symbols = match CsvAdapter::new(dir.clone()).list_symbols() {
        Ok(s) => s,
        Err(e) => return report(e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, DcaError> {
    let defaults = BacktestConfig::default();
    Ok(BacktestConfig {
        initial_capital: read_f64(adapter, "backtest", "initial_capital", defaults.initial_capital)?,
        commission_pct: read_f64(adapter, "backtest", "commission_pct", defaults.commission_pct)?,
        start_date: parse_optional_date(adapter, "start_date")?,
        end_date: parse_optional_date(adapter, "end_date")?,
        parallel: read_bool(adapter, "backtest", "parallel", defaults.parallel)?,
    })
}

/// Build and validate a `[strategy]` section.
pub fn build_strategy_config(adapter: &dyn ConfigPort) -> Result<StrategyConfig, DcaError> {
    let raw_policy = adapter
        .get_string("strategy", "policy")
        .ok_or_else(|| DcaError::missing("strategy", "policy"))?;
    let policy = parse_policy(&raw_policy, adapter)?;

    let default_period = match policy {
        DcaPolicy::MultiFactor { .. } => 1,
        _ => 3,
    };
    let name = adapter
        .get_string("strategy", "name")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| policy.name().to_string());

    let alloc_defaults = AllocationConfig::default();
    let base_risk_percent = read_optional_f64(adapter, "strategy", "base_risk_percent")?;

    let period_defaults = IndicatorPeriods::default();
    let config = StrategyConfig {
        name,
        policy,
        period_days: read_i64(adapter, "strategy", "period_days", default_period)?,
        allocation: AllocationConfig {
            invest_amount: read_f64(adapter, "strategy", "invest_amount", alloc_defaults.invest_amount)?,
            min_investment: read_f64(adapter, "strategy", "min_investment", alloc_defaults.min_investment)?,
            max_investment: read_f64(adapter, "strategy", "max_investment", alloc_defaults.max_investment)?,
            base_risk_percent,
            whole_units: read_bool(adapter, "strategy", "whole_units", alloc_defaults.whole_units)?,
        },
        indicators: IndicatorPeriods {
            sma: read_period(adapter, "sma_period", period_defaults.sma)?,
            stddev: read_period(adapter, "std_period", period_defaults.stddev)?,
            volume: read_period(adapter, "vol_period", period_defaults.volume)?,
            atr: read_period(adapter, "atr_period", period_defaults.atr)?,
            t_percent: read_f64(adapter, "strategy", "t_percent", period_defaults.t_percent)?,
        },
    };

    validate_strategy(&config)?;
    Ok(config)
}

fn parse_policy(raw: &str, adapter: &dyn ConfigPort) -> Result<DcaPolicy, DcaError> {
    match raw.trim().to_lowercase().as_str() {
        "flat" => Ok(DcaPolicy::Flat),
        "step" => Ok(DcaPolicy::Step {
            adjustment: read_f64(adapter, "strategy", "adjustment", 5.0)?,
        }),
        "momentum" => Ok(DcaPolicy::MomentumInverse {
            max_increase: read_f64(adapter, "strategy", "max_increase", 0.5)?,
            max_decrease: read_f64(adapter, "strategy", "max_decrease", 0.5)?,
        }),
        "multi_factor" => Ok(DcaPolicy::MultiFactor {
            min_entry_distance: read_f64(adapter, "strategy", "min_entry_distance", 0.05)?,
        }),
        other => Err(DcaError::invalid(
            "strategy",
            "policy",
            format!("unknown policy {:?}, expected flat, step, momentum or multi_factor", other),
        )),
    }
}

fn read_period(adapter: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, DcaError> {
    let value = read_i64(adapter, "strategy", key, default as i64)?;
    usize::try_from(value)
        .ok()
        .filter(|&v| v >= 1)
        .ok_or_else(|| DcaError::invalid("strategy", key, format!("{} must be at least 1", key)))
}

pub fn resolve_tickers(override_ticker: Option<&str>, config: &dyn ConfigPort) -> Result<Vec<String>, DcaError> {
    let raw = match override_ticker {
        Some(t) => t.to_string(),
        None => config
            .get_string("backtest", "tickers")
            .or_else(|| config.get_string("backtest", "ticker"))
            .ok_or_else(|| DcaError::missing("backtest", "tickers"))?,
    };
    parse_tickers(&raw).map_err(|e| DcaError::invalid("backtest", "tickers", e.to_string()))
}

pub fn resolve_data_dir(override_dir: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => config
            .get_string("backtest", "data_dir")
            .filter(|s| !s.trim().is_empty())
            .map(|s| PathBuf::from(s.trim()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
    }
}
