//! Strategy configuration and the per-bar decision engine.
//!
//! Per bar: update rolling indicators → cadence gate → signal → allocation → buy intent.
//! Fills come back through [`DcaStrategy::notify_order`] on a later bar.

use chrono::NaiveDate;

use super::cadence::is_entry_due;
use super::config_validation::validate_strategy;
use super::error::DcaError;
use super::indicator::{IndicatorPeriods, IndicatorSet};
use super::ohlcv::OhlcvBar;
use super::order::{BuyIntent, OrderEvent, OrderNotification, OrderTracker};
use super::position::EntryBook;
use super::signal::{self, DcaPolicy, SignalContext};
use super::sizing::{passes_entry_distance, Allocation, AllocationConfig, Allocator, SkipReason};

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub name: String,
    pub policy: DcaPolicy,
    pub period_days: i64,
    pub allocation: AllocationConfig,
    pub indicators: IndicatorPeriods,
}

impl StrategyConfig {
    /// Plain periodic fixed-amount buys.
    pub fn flat(name: &str, invest_amount: f64, period_days: i64) -> Self {
        StrategyConfig {
            name: name.to_string(),
            policy: DcaPolicy::Flat,
            period_days,
            allocation: AllocationConfig {
                invest_amount,
                min_investment: 0.0,
                max_investment: invest_amount,
                ..AllocationConfig::default()
            },
            indicators: IndicatorPeriods::default(),
        }
    }
}

/// Broker state the engine reads each bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrokerState {
    pub cash: f64,
    pub portfolio_value: f64,
}

/// Why a bar produced no buy intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarOutcome {
    Bought,
    OrderPending,
    NotDue,
    WarmingUp,
    Skipped(SkipReason),
}

#[derive(Debug, Clone)]
pub struct DcaStrategy {
    config: StrategyConfig,
    indicators: IndicatorSet,
    allocator: Allocator,
    tracker: OrderTracker,
    last_outcome: Option<BarOutcome>,
    last_signal: Option<f64>,
}

impl DcaStrategy {
    /// Build a strategy; misconfiguration fails here, before any bar is seen.
    pub fn new(config: StrategyConfig) -> Result<Self, DcaError> {
        validate_strategy(&config)?;
        Ok(DcaStrategy {
            indicators: IndicatorSet::new(&config.indicators),
            allocator: Allocator::new(config.policy, config.allocation),
            tracker: OrderTracker::new(),
            last_outcome: None,
            last_signal: None,
            config,
        })
    }

    pub fn on_bar(&mut self, bar: &OhlcvBar, broker: &BrokerState) -> Option<BuyIntent> {
        self.indicators.update(bar);
        let (outcome, intent) = self.decide(bar, broker);
        self.last_outcome = Some(outcome);
        intent
    }

    fn decide(&mut self, bar: &OhlcvBar, broker: &BrokerState) -> (BarOutcome, Option<BuyIntent>) {
        let date = bar.date();
        let price = bar.close;

        if self.tracker.has_pending() {
            tracing::debug!(strategy = %self.config.name, %date, "order in flight, skipping bar");
            return (BarOutcome::OrderPending, None);
        }
        if !is_entry_due(date, self.tracker.last_buy_date(), self.config.period_days) {
            return (BarOutcome::NotDue, None);
        }

        let readings = self.indicators.readings();
        if self.config.policy.needs_indicators() && readings.is_none() {
            return (BarOutcome::WarmingUp, None);
        }

        if let DcaPolicy::MultiFactor { min_entry_distance } = self.config.policy {
            let last_entry = self.tracker.book().last().map(|e| e.price);
            if !passes_entry_distance(last_entry, price, min_entry_distance) {
                return (BarOutcome::Skipped(SkipReason::EntryDistance), None);
            }
        }

        let ctx = SignalContext {
            date,
            price,
            volume: bar.volume,
            last_buy_price: self.tracker.last_buy_price(),
            last_buy_date: self.tracker.last_buy_date(),
            readings,
        };
        let strength = signal::score(&self.config.policy, &ctx);
        self.last_signal = Some(strength);

        let allocation = self.allocator.size_order(
            strength,
            price,
            ctx.last_buy_price,
            broker.cash,
            broker.portfolio_value,
        );

        match allocation {
            Allocation::Order { size, amount } => {
                let intent = BuyIntent::market(size);
                if !self.tracker.submit(&intent, date) {
                    return (BarOutcome::OrderPending, None);
                }
                tracing::info!(
                    strategy = %self.config.name,
                    %date,
                    price,
                    size,
                    amount,
                    signal = strength,
                    "buy created"
                );
                (BarOutcome::Bought, Some(intent))
            }
            Allocation::Skipped(reason) => {
                tracing::debug!(
                    strategy = %self.config.name,
                    %date,
                    cash = broker.cash,
                    ?reason,
                    "buy skipped"
                );
                (BarOutcome::Skipped(reason), None)
            }
        }
    }

    pub fn notify_order(&mut self, notification: &OrderNotification) -> OrderEvent {
        let event = self.tracker.notify(notification);
        match &event {
            OrderEvent::Filled(entry) => tracing::info!(
                strategy = %self.config.name,
                date = %entry.date,
                price = entry.price,
                size = entry.size,
                cost = notification.executed_value,
                commission = notification.commission,
                "buy executed"
            ),
            OrderEvent::Failed(status) => tracing::warn!(
                strategy = %self.config.name,
                date = %notification.date,
                status = status.name(),
                "order failed"
            ),
            OrderEvent::EmptyFill => tracing::warn!(
                strategy = %self.config.name,
                date = %notification.date,
                "order completed with no size"
            ),
            OrderEvent::Unsolicited => tracing::warn!(
                strategy = %self.config.name,
                status = notification.status.name(),
                "notification with no order outstanding"
            ),
            OrderEvent::Pending => {}
        }
        event
    }

    /// Feed the broker's position size; a flat position clears the entry book.
    pub fn sync_position(&mut self, position_size: f64) {
        self.tracker.sync_position(position_size);
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn has_pending_order(&self) -> bool {
        self.tracker.has_pending()
    }

    pub fn entries(&self) -> &EntryBook {
        self.tracker.book()
    }

    pub fn tracker(&self) -> &OrderTracker {
        &self.tracker
    }

    pub fn indicators(&self) -> &IndicatorSet {
        &self.indicators
    }

    pub fn last_buy_date(&self) -> Option<NaiveDate> {
        self.tracker.last_buy_date()
    }

    pub fn last_outcome(&self) -> Option<BarOutcome> {
        self.last_outcome
    }

    pub fn last_signal(&self) -> Option<f64> {
        self.last_signal
    }

    pub fn average_entry_price(&self) -> f64 {
        self.tracker.book().weighted_average_price()
    }
}
