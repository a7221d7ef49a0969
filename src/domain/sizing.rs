//! Position-size allocation.
//!
//! Turns a signal multiplier into an order size:
//! 1. desired dollars = base * signal, or the running step amount for the step policy
//! 2. clamp into [min_investment, max_investment]
//! 3. cap at available cash
//! 4. divide by price; a non-positive price or size skips the cycle

use super::signal::DcaPolicy;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationConfig {
    pub invest_amount: f64,
    pub min_investment: f64,
    pub max_investment: f64,
    /// When set, the base amount is this percentage of portfolio value.
    pub base_risk_percent: Option<f64>,
    pub whole_units: bool,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        AllocationConfig {
            invest_amount: 100.0,
            min_investment: 50.0,
            max_investment: 200.0,
            base_risk_percent: None,
            whole_units: false,
        }
    }
}

/// Why a cycle produced no order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NonPositivePrice,
    InsufficientCapital,
    ZeroSize,
    EntryDistance,
}

/// Result of a sizing attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Allocation {
    Order { size: f64, amount: f64 },
    Skipped(SkipReason),
}

pub fn clamp_amount(amount: f64, min_investment: f64, max_investment: f64) -> f64 {
    amount.max(min_investment).min(max_investment)
}

/// Convert a desired dollar amount into a bounded unit size.
pub fn size_for_amount(
    desired: f64,
    config: &AllocationConfig,
    available_cash: f64,
    price: f64,
) -> Allocation {
    if price.is_nan() || price <= 0.0 {
        return Allocation::Skipped(SkipReason::NonPositivePrice);
    }

    let amount = clamp_amount(desired, config.min_investment, config.max_investment);
    let amount = amount.min(available_cash);
    if amount.is_nan() || amount <= 0.0 {
        return Allocation::Skipped(SkipReason::InsufficientCapital);
    }

    let mut size = amount / price;
    if config.whole_units {
        size = size.floor();
    }
    if size <= 0.0 {
        return Allocation::Skipped(SkipReason::ZeroSize);
    }

    Allocation::Order {
        size,
        amount: size * price,
    }
}

/// Percentage drop since the last entry must reach `min_entry_distance`.
/// Always passes before the first entry.
pub fn passes_entry_distance(last_entry: Option<f64>, price: f64, min_entry_distance: f64) -> bool {
    match last_entry {
        None => true,
        Some(last) if last <= 0.0 => true,
        Some(last) => (last - price) / last * 100.0 >= min_entry_distance,
    }
}

/// Allocator for one strategy instance; owns the running amount of the step policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocator {
    policy: DcaPolicy,
    config: AllocationConfig,
    running_amount: f64,
}

impl Allocator {
    pub fn new(policy: DcaPolicy, config: AllocationConfig) -> Self {
        Allocator {
            policy,
            config,
            running_amount: config.invest_amount,
        }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    pub fn running_amount(&self) -> f64 {
        self.running_amount
    }

    pub fn base_amount(&self, portfolio_value: f64) -> f64 {
        match self.config.base_risk_percent {
            Some(pct) => portfolio_value * pct / 100.0,
            None => self.config.invest_amount,
        }
    }

    /// Dollar amount before bounds and cash are applied.
    ///
    /// The step policy mutates its running amount, so call this once per due cycle.
    pub fn desired_amount(
        &mut self,
        signal: f64,
        price: f64,
        last_buy_price: Option<f64>,
        portfolio_value: f64,
    ) -> f64 {
        match self.policy {
            DcaPolicy::Step { adjustment } => {
                self.running_amount = match last_buy_price {
                    None => self.base_amount(portfolio_value),
                    Some(last) if price < last => self.running_amount + adjustment,
                    Some(last) if price > last => self.running_amount - adjustment,
                    Some(_) => self.running_amount,
                };
                self.running_amount = clamp_amount(
                    self.running_amount,
                    self.config.min_investment,
                    self.config.max_investment,
                );
                self.running_amount
            }
            DcaPolicy::Flat | DcaPolicy::MomentumInverse { .. } | DcaPolicy::MultiFactor { .. } => {
                self.base_amount(portfolio_value) * signal
            }
        }
    }

    pub fn size_order(
        &mut self,
        signal: f64,
        price: f64,
        last_buy_price: Option<f64>,
        available_cash: f64,
        portfolio_value: f64,
    ) -> Allocation {
        let desired = self.desired_amount(signal, price, last_buy_price, portfolio_value);
        size_for_amount(desired, &self.config, available_cash, price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn config() -> AllocationConfig {
        AllocationConfig {
            invest_amount: 100.0,
            min_investment: 50.0,
            max_investment: 200.0,
            base_risk_percent: None,
            whole_units: false,
        }
    }

    fn order(allocation: Allocation) -> (f64, f64) {
        match allocation {
            Allocation::Order { size, amount } => (size, amount),
            Allocation::Skipped(reason) => panic!("expected order, skipped: {reason:?}"),
        }
    }

    #[test]
    fn neutral_signal_within_bounds() {
        let mut allocator = Allocator::new(
            DcaPolicy::MomentumInverse {
                max_increase: 0.5,
                max_decrease: 0.5,
            },
            config(),
        );
        let (size, amount) = order(allocator.size_order(1.0, 25.0, None, 10_000.0, 10_000.0));
        assert_abs_diff_eq!(amount, 100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(size, 100.0 / 25.0, epsilon = 1e-12);
    }

    #[test]
    fn cash_caps_amount() {
        let (size, amount) = order(size_for_amount(100.0, &config(), 30.0, 10.0));
        assert_abs_diff_eq!(amount, 30.0, epsilon = 1e-12);
        assert_abs_diff_eq!(size, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn amount_clamped_to_bounds() {
        let (_, high) = order(size_for_amount(1_000.0, &config(), 10_000.0, 10.0));
        assert_abs_diff_eq!(high, 200.0, epsilon = 1e-12);
        let (_, low) = order(size_for_amount(1.0, &config(), 10_000.0, 10.0));
        assert_abs_diff_eq!(low, 50.0, epsilon = 1e-12);
    }

    #[test]
    fn skips_on_bad_price_or_no_cash() {
        assert_eq!(
            size_for_amount(100.0, &config(), 1_000.0, 0.0),
            Allocation::Skipped(SkipReason::NonPositivePrice)
        );
        assert_eq!(
            size_for_amount(100.0, &config(), 1_000.0, -5.0),
            Allocation::Skipped(SkipReason::NonPositivePrice)
        );
        assert_eq!(
            size_for_amount(100.0, &config(), 0.0, 10.0),
            Allocation::Skipped(SkipReason::InsufficientCapital)
        );
    }

    #[test]
    fn whole_units_floor_and_skip_fractional() {
        let cfg = AllocationConfig {
            whole_units: true,
            ..config()
        };
        let (size, amount) = order(size_for_amount(100.0, &cfg, 10_000.0, 30.0));
        assert_eq!(size, 3.0);
        assert_abs_diff_eq!(amount, 90.0, epsilon = 1e-12);
        assert_eq!(
            size_for_amount(100.0, &cfg, 10_000.0, 500.0),
            Allocation::Skipped(SkipReason::ZeroSize)
        );
    }

    #[test]
    fn step_policy_moves_running_amount() {
        let mut allocator = Allocator::new(DcaPolicy::Step { adjustment: 5.0 }, config());

        assert_eq!(allocator.desired_amount(1.0, 100.0, None, 0.0), 100.0);
        assert_eq!(allocator.desired_amount(1.0, 95.0, Some(100.0), 0.0), 105.0);
        assert_eq!(allocator.desired_amount(1.0, 90.0, Some(95.0), 0.0), 110.0);
        assert_eq!(allocator.desired_amount(1.0, 99.0, Some(90.0), 0.0), 105.0);
        assert_eq!(allocator.desired_amount(1.0, 99.0, Some(99.0), 0.0), 105.0);
    }

    #[test]
    fn step_policy_reclamps_each_cycle() {
        let mut allocator = Allocator::new(DcaPolicy::Step { adjustment: 60.0 }, config());
        allocator.desired_amount(1.0, 100.0, None, 0.0);
        assert_eq!(allocator.desired_amount(1.0, 90.0, Some(100.0), 0.0), 160.0);
        assert_eq!(allocator.desired_amount(1.0, 80.0, Some(90.0), 0.0), 200.0);
        assert_eq!(allocator.desired_amount(1.0, 90.0, Some(80.0), 0.0), 140.0);
        assert_eq!(allocator.desired_amount(1.0, 95.0, Some(90.0), 0.0), 80.0);
        assert_eq!(allocator.desired_amount(1.0, 99.0, Some(95.0), 0.0), 50.0);
        assert_eq!(allocator.running_amount(), 50.0);
    }

    #[test]
    fn base_risk_percent_scales_with_portfolio() {
        let cfg = AllocationConfig {
            base_risk_percent: Some(0.5),
            min_investment: 0.0,
            max_investment: 1_000_000.0,
            ..config()
        };
        let mut allocator = Allocator::new(DcaPolicy::MultiFactor { min_entry_distance: 0.0 }, cfg);
        assert_abs_diff_eq!(allocator.base_amount(200_000.0), 1_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            allocator.desired_amount(1.5, 10.0, None, 200_000.0),
            1_500.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn entry_distance_gate() {
        assert!(passes_entry_distance(None, 100.0, 0.05));
        // 0.1% drop passes a 0.05% threshold
        assert!(passes_entry_distance(Some(100.0), 99.9, 0.05));
        // 0.01% drop does not
        assert!(!passes_entry_distance(Some(100.0), 99.99, 0.05));
        // a rise never passes a positive threshold
        assert!(!passes_entry_distance(Some(100.0), 101.0, 0.05));
    }

    proptest! {
        #[test]
        fn cost_never_exceeds_cash_or_bounds(
            desired in 0.0..10_000.0_f64,
            cash in 0.0..1_000.0_f64,
            price in 0.01..500.0_f64,
            min in 1.0..100.0_f64,
            span in 0.0..500.0_f64,
        ) {
            let cfg = AllocationConfig {
                invest_amount: 100.0,
                min_investment: min,
                max_investment: min + span,
                base_risk_percent: None,
                whole_units: false,
            };
            match size_for_amount(desired, &cfg, cash, price) {
                Allocation::Order { size, amount } => {
                    prop_assert!(size > 0.0);
                    prop_assert!(amount <= cash + 1e-9);
                    prop_assert!(amount <= cfg.max_investment + 1e-9);
                    let expected = clamp_amount(desired, cfg.min_investment, cfg.max_investment).min(cash);
                    prop_assert!((amount - expected).abs() <= 1e-9 * expected.max(1.0));
                }
                Allocation::Skipped(reason) => {
                    prop_assert_eq!(reason, SkipReason::InsufficientCapital);
                    prop_assert!(cash <= 0.0);
                }
            }
        }
    }
}
