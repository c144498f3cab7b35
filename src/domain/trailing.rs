//! Trailing-stop decision policy.
//!
//! Pure math over an order snapshot and the latest observed price.
//! Three independent decisions per run-cycle:
//!
//! 1. Watermark: raise `highest_observed_price` on any new high.
//! 2. Adjustment: once price clears `stop × adjustment_threshold`,
//!    re-place the stop at `price × stop_trail_factor` (the 0.5% threshold
//!    keeps the exchange round-trip worth its cost).
//! 3. Liquidation: once price retraces below
//!    `watermark × retracement_factor`, market-sell the position.
//!
//! All comparisons are strict (`>` / `<`), matching the boundary cases in
//! the unit tests below.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use super::order::Order;

/// Tunable factors for the trailing-stop policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrailingPolicy {
    /// Price must exceed `stop × this` before an adjustment fires.
    pub adjustment_threshold: Decimal,
    /// New stop = trigger price × this.
    pub stop_trail_factor: Decimal,
    /// Limit price of the stop-limit order = stop × this.
    pub limit_offset_factor: Decimal,
    /// Liquidate when price < watermark × this.
    pub retracement_factor: Decimal,
}

impl Default for TrailingPolicy {
    /// Production defaults: 0.5% adjustment threshold, 1% trail, 1% retracement.
    fn default() -> Self {
        Self {
            adjustment_threshold: dec!(1.005),
            stop_trail_factor: dec!(1.01),
            limit_offset_factor: dec!(0.99),
            retracement_factor: dec!(0.99),
        }
    }
}

/// What one run-cycle should do, computed before any I/O happens.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleDecision {
    /// New watermark to persist, when the price made a new high.
    pub raise_watermark_to: Option<Decimal>,
    /// New stop price to place, when the adjustment threshold cleared.
    pub adjust_stop_to: Option<Decimal>,
    /// Whether the retracement tripped and the position must be sold.
    pub liquidate: bool,
}

impl CycleDecision {
    /// True when the cycle has nothing to do.
    pub fn is_hold(&self) -> bool {
        self.raise_watermark_to.is_none() && self.adjust_stop_to.is_none() && !self.liquidate
    }
}

impl TrailingPolicy {
    /// Whether `latest` clears the adjustment threshold over `stop_price`.
    pub fn should_adjust(&self, stop_price: Decimal, latest: Decimal) -> bool {
        latest > stop_price * self.adjustment_threshold
    }

    /// Stop price to trail behind a trigger at `latest`.
    pub fn new_stop(&self, latest: Decimal) -> Decimal {
        latest * self.stop_trail_factor
    }

    /// Limit price for the stop-limit sell at `stop`.
    pub fn limit_price(&self, stop: Decimal) -> Decimal {
        stop * self.limit_offset_factor
    }

    /// Whether `latest` has retraced far enough below `watermark` to sell.
    pub fn should_liquidate(&self, watermark: Decimal, latest: Decimal) -> bool {
        latest < watermark * self.retracement_factor
    }

    /// Evaluate all three decisions for an order snapshot.
    ///
    /// The liquidation check runs against the *raised* watermark when the
    /// same tick both sets a new high and triggers nothing else — the
    /// watermark write always happens first in the cycle.
    pub fn decide(&self, order: &Order, latest: Decimal) -> CycleDecision {
        let raise_watermark_to =
            (latest > order.highest_observed_price).then_some(latest);
        let effective_watermark = raise_watermark_to.unwrap_or(order.highest_observed_price);

        CycleDecision {
            raise_watermark_to,
            adjust_stop_to: self
                .should_adjust(order.stop_price, latest)
                .then(|| self.new_stop(latest)),
            liquidate: self.should_liquidate(effective_watermark, latest),
        }
    }
}
