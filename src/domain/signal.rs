//! Signal strength evaluation.
//!
//! A signal is a dimensionless multiplier (> 0) applied to the base investment
//! amount. Degenerate inputs (zero price, zero prior price, zero averages) fall back
//! to the neutral multiplier 1.0 instead of producing NaN or infinity.

use chrono::NaiveDate;

use super::indicator::IndicatorReadings;

pub const NEUTRAL_SIGNAL: f64 = 1.0;

/// Floor for a blended score that came out non-positive. Small enough that the
/// allocator always clamps the resulting amount up to `min_investment`.
pub const MIN_SIGNAL: f64 = 1e-9;

pub const SMA_WEIGHT: f64 = 0.4;
pub const VOLATILITY_WEIGHT: f64 = 0.2;
pub const VOLUME_WEIGHT: f64 = 0.3;
pub const TREND_WEIGHT: f64 = 0.1;

/// Sizing policy variants, selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DcaPolicy {
    /// Fixed amount every period.
    Flat,
    /// Running amount nudged by a fixed step after each price move, re-clamped each cycle.
    Step { adjustment: f64 },
    /// Multiplier that rewards dips twice as strongly as it trims rallies.
    MomentumInverse { max_increase: f64, max_decrease: f64 },
    /// Weighted blend of SMA distance, volatility, relative volume and swing trend.
    MultiFactor { min_entry_distance: f64 },
}

impl DcaPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            DcaPolicy::Flat => "flat",
            DcaPolicy::Step { .. } => "step",
            DcaPolicy::MomentumInverse { .. } => "momentum",
            DcaPolicy::MultiFactor { .. } => "multi_factor",
        }
    }

    /// Whether scoring needs warm rolling indicators.
    pub fn needs_indicators(&self) -> bool {
        matches!(self, DcaPolicy::MultiFactor { .. })
    }
}

/// Per-bar inputs to the evaluator. Built fresh each bar, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalContext {
    pub date: NaiveDate,
    pub price: f64,
    pub volume: f64,
    pub last_buy_price: Option<f64>,
    pub last_buy_date: Option<NaiveDate>,
    pub readings: Option<IndicatorReadings>,
}

pub fn score(policy: &DcaPolicy, ctx: &SignalContext) -> f64 {
    match *policy {
        DcaPolicy::Flat | DcaPolicy::Step { .. } => NEUTRAL_SIGNAL,
        DcaPolicy::MomentumInverse {
            max_increase,
            max_decrease,
        } => momentum_multiplier(ctx.price, ctx.last_buy_price, max_increase, max_decrease),
        DcaPolicy::MultiFactor { .. } => match ctx.readings {
            Some(readings) => multi_factor_score(ctx.price, ctx.volume, &readings),
            None => NEUTRAL_SIGNAL,
        },
    }
}

/// `1 + adjustment`, where a fall of x% adds 2x% and a rise of x% removes x%,
/// clamped into `[-max_decrease, max_increase]`.
pub fn momentum_multiplier(
    price: f64,
    last_buy_price: Option<f64>,
    max_increase: f64,
    max_decrease: f64,
) -> f64 {
    let Some(last) = last_buy_price else {
        return NEUTRAL_SIGNAL;
    };
    if last <= 0.0 || price <= 0.0 {
        return NEUTRAL_SIGNAL;
    }

    let change = (price - last) / last;
    let adjustment = if change < 0.0 { -2.0 * change } else { -change };
    let adjustment = adjustment.clamp(-max_decrease, max_increase);
    let multiplier = 1.0 + adjustment;

    if multiplier.is_finite() && multiplier > 0.0 {
        multiplier
    } else {
        NEUTRAL_SIGNAL
    }
}

/// 5x the relative distance below the SMA, capped at 1. Negative above the SMA.
pub fn sma_factor(price: f64, sma: f64) -> f64 {
    ((sma - price) / sma * 5.0).min(1.0)
}

/// 1 / (1 + ATR / price): shrinks toward 0 as volatility grows.
pub fn volatility_factor(price: f64, atr: f64) -> f64 {
    1.0 / (1.0 + atr / price)
}

/// Relative volume clamped into [1, 4].
pub fn volume_factor(volume: f64, avg_volume: f64) -> f64 {
    (volume / avg_volume).clamp(1.0, 4.0)
}

/// Percentage change of the cumulative swing index, scaled x10, offset by 1, in [0.5, 3].
pub fn trend_factor(asi: f64, asi_prev: f64) -> f64 {
    let change = if asi_prev != 0.0 {
        (asi - asi_prev) / asi_prev.abs()
    } else if asi > 0.0 {
        1.0
    } else if asi < 0.0 {
        -1.0
    } else {
        0.0
    };
    (change * 10.0 + 1.0).clamp(0.5, 3.0)
}

pub fn multi_factor_score(price: f64, volume: f64, readings: &IndicatorReadings) -> f64 {
    if price <= 0.0 || readings.sma == 0.0 || readings.avg_volume == 0.0 {
        return NEUTRAL_SIGNAL;
    }

    let blended = SMA_WEIGHT * sma_factor(price, readings.sma)
        + VOLATILITY_WEIGHT * volatility_factor(price, readings.atr)
        + VOLUME_WEIGHT * volume_factor(volume, readings.avg_volume)
        + TREND_WEIGHT * trend_factor(readings.asi, readings.asi_prev);

    if !blended.is_finite() {
        NEUTRAL_SIGNAL
    } else {
        blended.max(MIN_SIGNAL)
    }
}
