//! Property-Based Tests — Domain Layer Invariants
//!
//! Uses `proptest` to verify that the trailing-stop decision logic and
//! its supporting types maintain their invariants across random inputs.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use trailstop::adapters::feeds::backoff::Backoff;
use trailstop::config::FeedConfig;
use trailstop::domain::order::Order;
use trailstop::domain::profit::realized_pnl;
use trailstop::domain::tick::PriceTick;
use trailstop::domain::trade::{Trade, TradeType};
use trailstop::domain::trailing::TrailingPolicy;

/// Random positive price with two decimal places.
fn price() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

// ── Watermark Properties ────────────────────────────────────

proptest! {
    /// The watermark never decreases, whatever price sequence arrives.
    #[test]
    fn watermark_is_monotonically_non_decreasing(
        start in price(),
        prices in prop::collection::vec(price(), 1..50),
    ) {
        let mut order = Order::open("BTCUSDT", start, dec!(1));
        let mut previous = order.highest_observed_price;

        for latest in prices {
            if let Some(raised) = order.raise_watermark(latest) {
                order = raised;
            }
            prop_assert!(order.highest_observed_price >= previous);
            previous = order.highest_observed_price;
        }
    }

    /// Raising only happens on a strict new high.
    #[test]
    fn watermark_raise_requires_strict_high(start in price(), latest in price()) {
        let order = Order::open("BTCUSDT", start, dec!(1));
        let raised = order.raise_watermark(latest);
        prop_assert_eq!(raised.is_some(), latest > start);
    }
}

// ── Trailing Decision Properties ────────────────────────────

proptest! {
    /// An adjustment fires iff the price strictly clears stop × threshold,
    /// and the replacement stop is always above the old one.
    #[test]
    fn adjustment_trigger_and_stop_growth(stop in price(), latest in price()) {
        let policy = TrailingPolicy::default();
        let fires = policy.should_adjust(stop, latest);
        prop_assert_eq!(fires, latest > stop * dec!(1.005));

        if fires {
            let new_stop = policy.new_stop(latest);
            prop_assert!(new_stop > stop);
            prop_assert!(new_stop > latest);
        }
    }

    /// Liquidation fires iff the price is strictly below
    /// watermark × retracement.
    #[test]
    fn liquidation_trigger_boundary(watermark in price(), latest in price()) {
        let policy = TrailingPolicy::default();
        prop_assert_eq!(
            policy.should_liquidate(watermark, latest),
            latest < watermark * dec!(0.99)
        );
    }

    /// A tick can never simultaneously raise the watermark and trip the
    /// retracement — the decision uses the raised watermark.
    #[test]
    fn new_high_never_liquidates(start in price(), latest in price()) {
        let policy = TrailingPolicy::default();
        let order = Order::open("BTCUSDT", start, dec!(1));
        let decision = policy.decide(&order, latest);
        if decision.raise_watermark_to.is_some() {
            prop_assert!(!decision.liquidate);
        }
    }
}

// ── Tick Validation Properties ──────────────────────────────

proptest! {
    /// Non-positive prices never become ticks.
    #[test]
    fn non_positive_prices_never_become_ticks(cents in -10_000_000i64..=0) {
        let price = Decimal::new(cents, 2);
        prop_assert!(PriceTick::record("BTCUSDT", price, chrono::Utc::now()).is_err());
    }
}

// ── Profit Properties ───────────────────────────────────────

proptest! {
    /// A flat round trip at the same price loses exactly the fees.
    #[test]
    fn flat_round_trip_loses_the_fees(p in price(), qty in price(), fee in price()) {
        let trades = vec![
            Trade::executed("BTCUSDT", TradeType::Buy, p, qty, fee),
            Trade::executed("BTCUSDT", TradeType::Sell, p, qty, fee),
        ];
        prop_assert_eq!(realized_pnl(&trades), -fee * dec!(2));
    }
}

// ── Backoff Properties ──────────────────────────────────────

proptest! {
    /// The schedule yields exactly max_retries delays, never exceeds the
    /// cap, and never shrinks between attempts.
    #[test]
    fn backoff_respects_budget_and_cap(
        max_retries in 1u32..20,
        base_ms in 1u64..5_000,
        cap_multiplier in 1u64..100,
    ) {
        let config = FeedConfig {
            max_retries,
            base_reconnect_delay_ms: base_ms,
            backoff_factor: 1.5,
            max_reconnect_delay_ms: base_ms * cap_multiplier,
        };
        let mut backoff = Backoff::new(&config);
        let cap = std::time::Duration::from_millis(config.max_reconnect_delay_ms);

        let mut delays = Vec::new();
        while let Some(delay) = backoff.next_delay() {
            delays.push(delay);
        }

        prop_assert_eq!(delays.len(), max_retries as usize);
        prop_assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(delays.iter().all(|d| *d <= cap));
        prop_assert_eq!(delays[0], std::time::Duration::from_millis(base_ms));
    }
}
