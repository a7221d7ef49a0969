//! Simulated cash broker for backtests.
//!
//! Market buys fill at the close of the submitting bar, reported on the next bar.
//! Orders whose cost plus commission exceeds cash at fill time come back as `Margin`.
//! Cash comparisons allow a relative slack of [`CASH_TOLERANCE`] so an order sized
//! to the reported spendable cash always settles, leaving exactly zero behind.

use super::ohlcv::OhlcvBar;
use super::order::{BuyIntent, OrderNotification, OrderStatus};
use super::strategy::BrokerState;

pub const CASH_TOLERANCE: f64 = 1e-9;

/// commission = trade_value * pct / 100
pub fn calculate_commission(trade_value: f64, commission_pct: f64) -> f64 {
    trade_value * commission_pct / 100.0
}

#[derive(Debug, Clone, PartialEq)]
struct QueuedOrder {
    size: f64,
    price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedBroker {
    cash: f64,
    commission_pct: f64,
    units: f64,
    invested: f64,
    commission_paid: f64,
    queued: Option<QueuedOrder>,
}

impl SimulatedBroker {
    pub fn new(initial_capital: f64, commission_pct: f64) -> Self {
        SimulatedBroker {
            cash: initial_capital,
            commission_pct,
            units: 0.0,
            invested: 0.0,
            commission_paid: 0.0,
            queued: None,
        }
    }

    /// Spendable cash leaves room for the commission of a full spend.
    pub fn state(&self, price: f64) -> BrokerState {
        BrokerState {
            cash: self.cash / (1.0 + self.commission_pct / 100.0),
            portfolio_value: self.portfolio_value(price),
        }
    }

    /// Queue a market buy at the bar's close. Returns the `Submitted` notice, or
    /// `Rejected` when the size is unusable or another order is queued.
    pub fn submit(&mut self, intent: &BuyIntent, bar: &OhlcvBar) -> OrderNotification {
        let date = bar.date();
        if self.queued.is_some() || !(intent.size.is_finite() && intent.size > 0.0) {
            return OrderNotification::status_only(OrderStatus::Rejected, date);
        }
        self.queued = Some(QueuedOrder {
            size: intent.size,
            price: bar.close,
        });
        OrderNotification::status_only(OrderStatus::Submitted, date)
    }

    /// Settle the queued order on the next bar.
    pub fn process_pending(&mut self, bar: &OhlcvBar) -> Vec<OrderNotification> {
        let Some(order) = self.queued.take() else {
            return Vec::new();
        };
        let date = bar.date();
        let accepted = OrderNotification::status_only(OrderStatus::Accepted, date);

        let value = order.size * order.price;
        let commission = calculate_commission(value, self.commission_pct);
        let cost = value + commission;
        let slack = self.cash * CASH_TOLERANCE;
        if cost > self.cash + slack {
            return vec![accepted, OrderNotification::status_only(OrderStatus::Margin, date)];
        }

        // Rounding dust from a full spend is not spendable cash.
        self.cash = if self.cash - cost <= slack {
            0.0
        } else {
            self.cash - cost
        };
        self.units += order.size;
        self.invested += value;
        self.commission_paid += commission;
        vec![
            accepted,
            OrderNotification::completed(order.price, order.size, commission, date),
        ]
    }

    pub fn portfolio_value(&self, price: f64) -> f64 {
        self.cash + self.units * price
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn units(&self) -> f64 {
        self.units
    }

    pub fn invested(&self) -> f64 {
        self.invested
    }

    pub fn commission_paid(&self) -> f64 {
        self.commission_paid
    }

    pub fn has_queued_order(&self) -> bool {
        self.queued.is_some()
    }
}
