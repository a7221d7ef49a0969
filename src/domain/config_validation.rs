//! Configuration validation.
//!
//! `[backtest]` is validated straight off the config port; strategies are validated
//! in their typed form so both INI-built and programmatic configs go through the same checks.

use crate::domain::error::DcaError;
use crate::domain::signal::DcaPolicy;
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), DcaError> {
    validate_initial_capital(config)?;
    validate_commission(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_strategy(config: &StrategyConfig) -> Result<(), DcaError> {
    if config.name.trim().is_empty() {
        return Err(DcaError::missing("strategy", "name"));
    }
    if config.period_days < 1 {
        return Err(DcaError::invalid("strategy", "period_days", "period_days must be at least 1"));
    }
    validate_allocation(config)?;
    validate_policy(&config.policy)?;
    validate_indicator_periods(config)?;
    Ok(())
}

fn require_finite(key: &str, value: f64) -> Result<f64, DcaError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DcaError::invalid("strategy", key, format!("{} must be finite", key)))
    }
}

fn require_non_negative(key: &str, value: f64) -> Result<f64, DcaError> {
    if require_finite(key, value)? < 0.0 {
        return Err(DcaError::invalid("strategy", key, format!("{} must be non-negative", key)));
    }
    Ok(value)
}

fn validate_allocation(config: &StrategyConfig) -> Result<(), DcaError> {
    let alloc = &config.allocation;
    if require_finite("invest_amount", alloc.invest_amount)? <= 0.0 {
        return Err(DcaError::invalid("strategy", "invest_amount", "invest_amount must be positive"));
    }
    let min = require_non_negative("min_investment", alloc.min_investment)?;
    let max = require_finite("max_investment", alloc.max_investment)?;
    if max <= 0.0 {
        return Err(DcaError::invalid("strategy", "max_investment", "max_investment must be positive"));
    }
    if min > max {
        return Err(DcaError::invalid(
            "strategy",
            "min_investment",
            "min_investment must not exceed max_investment",
        ));
    }
    if let Some(pct) = alloc.base_risk_percent {
        if require_finite("base_risk_percent", pct)? <= 0.0 || pct > 100.0 {
            return Err(DcaError::invalid(
                "strategy",
                "base_risk_percent",
                "base_risk_percent must be in (0, 100]",
            ));
        }
    }
    Ok(())
}

fn validate_policy(policy: &DcaPolicy) -> Result<(), DcaError> {
    match *policy {
        DcaPolicy::Flat => {}
        DcaPolicy::Step { adjustment } => {
            require_non_negative("adjustment", adjustment)?;
        }
        DcaPolicy::MomentumInverse {
            max_increase,
            max_decrease,
        } => {
            require_non_negative("max_increase", max_increase)?;
            if require_non_negative("max_decrease", max_decrease)? >= 1.0 {
                return Err(DcaError::invalid(
                    "strategy",
                    "max_decrease",
                    "max_decrease must be below 1",
                ));
            }
        }
        DcaPolicy::MultiFactor { min_entry_distance } => {
            require_finite("min_entry_distance", min_entry_distance)?;
        }
    }
    Ok(())
}

fn validate_indicator_periods(config: &StrategyConfig) -> Result<(), DcaError> {
    let periods = &config.indicators;
    for (key, value) in [
        ("sma_period", periods.sma),
        ("std_period", periods.stddev),
        ("vol_period", periods.volume),
        ("atr_period", periods.atr),
    ] {
        if value < 1 {
            return Err(DcaError::invalid("strategy", key, format!("{} must be at least 1", key)));
        }
    }
    if require_finite("t_percent", periods.t_percent)? <= 0.0 {
        return Err(DcaError::invalid("strategy", "t_percent", "t_percent must be positive"));
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), DcaError> {
    let value = read_f64(config, "backtest", "initial_capital", 0.0)?;
    if !value.is_finite() || value <= 0.0 {
        return Err(DcaError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), DcaError> {
    let pct = read_f64(config, "backtest", "commission_pct", 0.0)?;
    if !pct.is_finite() || pct < 0.0 {
        return Err(DcaError::invalid(
            "backtest",
            "commission_pct",
            "commission_pct must be non-negative",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), DcaError> {
    let start = parse_optional_date(config, "start_date")?;
    let end = parse_optional_date(config, "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(DcaError::invalid(
                "backtest",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

/// Raw value of `[section] key`, with blank treated as unset.
fn raw_value(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Optional number; present but unparsable is an error rather than a fallback.
pub fn read_optional_f64(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, DcaError> {
    match raw_value(config, section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| DcaError::invalid(section, key, format!("expected a number, got {:?}", raw))),
    }
}

pub fn read_f64(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, DcaError> {
    Ok(read_optional_f64(config, section, key)?.unwrap_or(default))
}

pub fn read_i64(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<i64, DcaError> {
    match raw_value(config, section, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| DcaError::invalid(section, key, format!("expected an integer, got {:?}", raw))),
    }
}

pub fn read_bool(config: &dyn ConfigPort, section: &str, key: &str, default: bool) -> Result<bool, DcaError> {
    match raw_value(config, section, key) {
        None => Ok(default),
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(DcaError::invalid(section, key, format!("expected true or false, got {:?}", raw))),
        },
    }
}

/// Optional `YYYY-MM-DD` date in `[backtest]`; blank counts as unset.
pub fn parse_optional_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, DcaError> {
    match config.get_string("backtest", key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                DcaError::invalid(
                    "backtest",
                    key,
                    format!("invalid {} format, expected YYYY-MM-DD", key),
                )
            }),
    }
}
