//! Order lifecycle tracking.
//!
//! ```text
//! NoOrder → Submitted → Accepted → {Completed | Canceled | Rejected | Margin}
//! ```
//!
//! At most one order is in flight per strategy instance. Fill notifications arrive on
//! a later bar than the submission; `Submitted`/`Accepted` notifications leave the
//! order pending, every terminal status returns the tracker to `NoOrder`.

use chrono::NaiveDate;

use super::position::{Entry, EntryBook};

/// Broker-reported order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Submitted,
    Accepted,
    Completed,
    Canceled,
    Rejected,
    Margin,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        match self {
            OrderStatus::Submitted | OrderStatus::Accepted => false,
            OrderStatus::Completed
            | OrderStatus::Canceled
            | OrderStatus::Rejected
            | OrderStatus::Margin => true,
        }
    }

    pub fn is_failure(self) -> bool {
        match self {
            OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Margin => true,
            OrderStatus::Submitted | OrderStatus::Accepted | OrderStatus::Completed => false,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OrderStatus::Submitted => "Submitted",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::Completed => "Completed",
            OrderStatus::Canceled => "Canceled",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Margin => "Margin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Market,
}

/// Outbound buy request emitted by a strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuyIntent {
    pub size: f64,
    pub kind: OrderKind,
}

impl BuyIntent {
    pub fn market(size: f64) -> Self {
        BuyIntent {
            size,
            kind: OrderKind::Market,
        }
    }
}

/// Inbound status report for the outstanding order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderNotification {
    pub status: OrderStatus,
    pub executed_price: f64,
    pub executed_size: f64,
    pub executed_value: f64,
    pub commission: f64,
    pub date: NaiveDate,
}

impl OrderNotification {
    pub fn status_only(status: OrderStatus, date: NaiveDate) -> Self {
        OrderNotification {
            status,
            executed_price: 0.0,
            executed_size: 0.0,
            executed_value: 0.0,
            commission: 0.0,
            date,
        }
    }

    pub fn completed(price: f64, size: f64, commission: f64, date: NaiveDate) -> Self {
        OrderNotification {
            status: OrderStatus::Completed,
            executed_price: price,
            executed_size: size,
            executed_value: price * size,
            commission,
            date,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrder {
    pub desired_size: f64,
    pub state: OrderStatus,
    pub submitted_on: NaiveDate,
}

/// What a notification did to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    /// Order still in flight.
    Pending,
    Filled(Entry),
    Failed(OrderStatus),
    /// Completed with a non-positive size; nothing recorded.
    EmptyFill,
    /// No order was outstanding.
    Unsolicited,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderTracker {
    pending: Option<PendingOrder>,
    book: EntryBook,
    position_size: f64,
    last_buy_price: Option<f64>,
    last_buy_date: Option<NaiveDate>,
    fills: usize,
    failures: usize,
}

impl OrderTracker {
    pub fn new() -> Self {
        OrderTracker::default()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingOrder> {
        self.pending.as_ref()
    }

    /// NoOrder → Submitted. Refused while another order is outstanding.
    pub fn submit(&mut self, intent: &BuyIntent, date: NaiveDate) -> bool {
        if self.pending.is_some() || intent.size.is_nan() || intent.size <= 0.0 {
            return false;
        }
        self.pending = Some(PendingOrder {
            desired_size: intent.size,
            state: OrderStatus::Submitted,
            submitted_on: date,
        });
        true
    }

    pub fn notify(&mut self, notification: &OrderNotification) -> OrderEvent {
        let Some(pending) = self.pending.as_mut() else {
            return OrderEvent::Unsolicited;
        };

        match notification.status {
            OrderStatus::Submitted | OrderStatus::Accepted => {
                pending.state = notification.status;
                OrderEvent::Pending
            }
            OrderStatus::Completed => {
                self.pending = None;
                let entry = Entry {
                    price: notification.executed_price,
                    size: notification.executed_size,
                    date: notification.date,
                };
                if !self.book.record(entry.clone()) {
                    return OrderEvent::EmptyFill;
                }
                self.position_size += entry.size;
                self.last_buy_price = Some(entry.price);
                self.last_buy_date = Some(entry.date);
                self.fills += 1;
                OrderEvent::Filled(entry)
            }
            OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Margin => {
                self.pending = None;
                self.failures += 1;
                OrderEvent::Failed(notification.status)
            }
        }
    }

    /// Apply an externally reported position size; a flat position clears the book.
    pub fn sync_position(&mut self, position_size: f64) {
        self.position_size = position_size;
        self.book.reset_if_flat(position_size);
    }

    pub fn book(&self) -> &EntryBook {
        &self.book
    }

    pub fn position_size(&self) -> f64 {
        self.position_size
    }

    pub fn last_buy_price(&self) -> Option<f64> {
        self.last_buy_price
    }

    pub fn last_buy_date(&self) -> Option<NaiveDate> {
        self.last_buy_date
    }

    pub fn fills(&self) -> usize {
        self.fills
    }

    pub fn failures(&self) -> usize {
        self.failures
    }
}
