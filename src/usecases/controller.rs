//! Order Controller - The Run-Cycle State Machine Driver
//!
//! One `run_cycle(symbol)` per scheduler tick:
//!
//! 1. No open order → seed one from the live exchange price and held
//!    quantity, then stop for this tick.
//! 2. Load the open order and the latest persisted tick; either missing
//!    is a recoverable no-op.
//! 3. Persist a raised watermark before anything depends on it.
//! 4. Price cleared the adjustment threshold → cancel/replace the
//!    exchange stop and persist the new stop. A failed round-trip leaves
//!    the stored order untouched; the previous stop stays authoritative.
//! 5. Price retraced 1% off the watermark → market-sell the full held
//!    quantity, record the fill, mark the order filled. Terminal.
//!
//! At most one cycle runs per symbol at any time: a `try_lock` on the
//! per-symbol mutex makes an overlapping cycle exit immediately with
//! `CycleOutcome::Skipped` and no side effects. Every path out of a
//! cycle is a typed outcome or error, so tests and callers assert on
//! values, not log output.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::adapters::metrics::BotMetrics;
use crate::config::AppConfig;
use crate::domain::order::Order;
use crate::domain::trade::{Trade, TradeType};
use crate::domain::trailing::TrailingPolicy;
use crate::ports::exchange::{ExchangeGateway, GatewayError};
use crate::ports::repository::{Repository, StoreError};

/// What a single run-cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
  /// A previous cycle for this symbol was still in flight.
  Skipped,
  /// No open order existed; a fresh one was created and the cycle ended.
  Initialized { order_id: Uuid },
  /// Open order or latest tick missing — nothing to do yet.
  NoData,
  /// Nothing crossed a decision boundary.
  Held,
  /// The watermark rose; stop and position unchanged.
  WatermarkRaised { watermark: Decimal },
  /// The stop was cancelled and re-placed higher.
  Adjusted { new_stop: Decimal },
  /// The retracement tripped and the position was sold.
  Liquidated {
    executed_qty: Decimal,
    executed_price: Decimal,
  },
}

impl CycleOutcome {
  /// Stable label for metrics and logs.
  pub fn label(&self) -> &'static str {
    match self {
      Self::Skipped => "skipped",
      Self::Initialized { .. } => "initialized",
      Self::NoData => "no_data",
      Self::Held => "held",
      Self::WatermarkRaised { .. } => "watermark_raised",
      Self::Adjusted { .. } => "adjusted",
      Self::Liquidated { .. } => "liquidated",
    }
  }
}

/// Why a run-cycle failed. State is left as the previous cycle saw it.
#[derive(Debug, Error)]
pub enum CycleError {
  /// Exchange call failed; deferred to the next cycle.
  #[error("exchange failure: {0}")]
  Gateway(#[from] GatewayError),
  /// Store read/write failed.
  #[error("store failure: {0}")]
  Store(#[from] StoreError),
  /// A precondition did not hold (e.g., non-positive held quantity).
  #[error("validation failure: {0}")]
  Validation(String),
  /// The symbol is not configured for trading.
  #[error("unknown symbol: {0}")]
  UnknownSymbol(String),
}

/// Drives the trailing-stop order lifecycle for all configured symbols.
pub struct OrderController<G: ExchangeGateway, R: Repository> {
  /// Exchange command port.
  gateway: Arc<G>,
  /// Persistence port.
  repository: Arc<R>,
  /// Pure decision policy.
  policy: TrailingPolicy,
  /// Symbol → held base asset (explicit config, never derived).
  base_assets: HashMap<String, String>,
  /// Per-symbol re-entrancy guards.
  guards: HashMap<String, Mutex<()>>,
  /// Cycle counters.
  metrics: Arc<BotMetrics>,
}

impl<G: ExchangeGateway, R: Repository> OrderController<G, R> {
  /// Build a controller for every active symbol in the configuration.
  pub fn new(
    config: &AppConfig,
    gateway: Arc<G>,
    repository: Arc<R>,
    metrics: Arc<BotMetrics>,
  ) -> Self {
    let active = config.symbols.iter().filter(|s| s.active);
    Self {
      gateway,
      repository,
      policy: config.trailing.clone(),
      base_assets: active
        .clone()
        .map(|s| (s.symbol.clone(), s.base_asset.clone()))
        .collect(),
      guards: active.map(|s| (s.symbol.clone(), Mutex::new(()))).collect(),
      metrics,
    }
  }

  /// Execute one run-cycle for a symbol.
  #[instrument(skip(self))]
  pub async fn run_cycle(&self, symbol: &str) -> Result<CycleOutcome, CycleError> {
    let guard = self
      .guards
      .get(symbol)
      .ok_or_else(|| CycleError::UnknownSymbol(symbol.to_string()))?;

    // Re-entrancy guard: overlapping cycles must not both act on a
    // stale watermark. The lock is held for the whole cycle and
    // releases on every exit path.
    let Ok(_held) = guard.try_lock() else {
      warn!(symbol, "Previous run-cycle still in flight, skipping");
      return Ok(CycleOutcome::Skipped);
    };

    let outcome = self.run_cycle_locked(symbol).await;
    if let Ok(ref outcome) = outcome {
      self
        .metrics
        .cycles_completed
        .with_label_values(&[symbol, outcome.label()])
        .inc();
    }
    outcome
  }

  /// The cycle body, running under the symbol's guard.
  async fn run_cycle_locked(&self, symbol: &str) -> Result<CycleOutcome, CycleError> {
    // Step 1: bootstrap when no open order exists.
    let Some(order) = self.repository.find_open_order(symbol).await? else {
      return self.initialize(symbol).await;
    };

    // Step 2: the decision needs the latest persisted price.
    let Some(tick) = self.repository.latest_tick(symbol).await? else {
      warn!(symbol, "No price tick recorded yet, skipping cycle");
      return Ok(CycleOutcome::NoData);
    };
    let latest = tick.price;

    let decision = self.policy.decide(&order, latest);

    // Step 3: the watermark write is durable before any dependent
    // decision acts — its own store round-trip, not batched with the
    // stop adjustment.
    let mut current = order;
    let mut outcome = CycleOutcome::Held;
    if let Some(raised) = current.raise_watermark(latest) {
      current = self.repository.update_order(&raised, current.version).await?;
      info!(symbol, watermark = %latest, "Watermark raised");
      outcome = CycleOutcome::WatermarkRaised { watermark: latest };
    }

    // Step 4: stop adjustment. A failure here leaves the stored order
    // unchanged and is reported after the liquidation check has had
    // its turn — the two decisions are independent.
    let mut adjustment_failure: Option<CycleError> = None;
    if let Some(new_stop) = decision.adjust_stop_to {
      match self.adjust_stop(&current, new_stop).await {
        Ok(adjusted) => {
          current = adjusted;
          info!(symbol, %new_stop, "Stop adjusted");
          outcome = CycleOutcome::Adjusted { new_stop };
        }
        Err(e) => {
          warn!(symbol, error = %e, "Stop adjustment failed, previous stop stays authoritative");
          adjustment_failure = Some(e);
        }
      }
    }

    // Step 5: liquidation check, independent of step 4.
    if decision.liquidate {
      let (executed_qty, executed_price) = self.liquidate(&current).await?;
      info!(symbol, %executed_qty, %executed_price, "Position liquidated");
      return Ok(CycleOutcome::Liquidated {
        executed_qty,
        executed_price,
      });
    }

    match adjustment_failure {
      Some(e) => Err(e),
      None => Ok(outcome),
    }
  }

  /// Step 1: create a fresh order seeded from the live exchange state.
  async fn initialize(&self, symbol: &str) -> Result<CycleOutcome, CycleError> {
    let base_asset = self
      .base_assets
      .get(symbol)
      .ok_or_else(|| CycleError::UnknownSymbol(symbol.to_string()))?;

    let price = self.gateway.get_current_price(symbol).await?;
    let quantity = self.gateway.get_held_quantity(base_asset).await?;
    if quantity <= Decimal::ZERO {
      return Err(CycleError::Validation(format!(
        "held quantity {quantity} for {base_asset} is not positive"
      )));
    }

    let order = Order::open(symbol, price, quantity);
    let created = self.repository.create_order(&order).await?;
    info!(symbol, order_id = %created.id, %price, %quantity, "Opened trailing-stop order");

    // No adjustment or liquidation on the creation tick.
    Ok(CycleOutcome::Initialized {
      order_id: created.id,
    })
  }

  /// Step 4: cancel/replace the exchange stop, then persist.
  ///
  /// Nothing is written unless both exchange calls succeeded, so a
  /// failure can never leave a half-adjusted order behind.
  async fn adjust_stop(&self, order: &Order, new_stop: Decimal) -> Result<Order, CycleError> {
    let adjusting = order.begin_adjustment();

    if let Some(exchange_order_id) = &adjusting.exchange_order_id {
      self
        .gateway
        .cancel_order(&adjusting.symbol, exchange_order_id)
        .await?;
    }

    let exchange_order_id = self
      .gateway
      .place_stop_order(
        &adjusting.symbol,
        adjusting.quantity,
        new_stop,
        self.policy.limit_price(new_stop),
      )
      .await?;

    let adjusted = adjusting.complete_adjustment(new_stop, exchange_order_id);
    let persisted = self.repository.update_order(&adjusted, order.version).await?;
    self.metrics.stop_adjustments.with_label_values(&[persisted.symbol.as_str()]).inc();
    Ok(persisted)
  }

  /// Step 5: market-sell the full held quantity and close the order.
  async fn liquidate(&self, order: &Order) -> Result<(Decimal, Decimal), CycleError> {
    let base_asset = self
      .base_assets
      .get(&order.symbol)
      .ok_or_else(|| CycleError::UnknownSymbol(order.symbol.clone()))?;

    let quantity = self.gateway.get_held_quantity(base_asset).await?;
    if quantity <= Decimal::ZERO {
      return Err(CycleError::Validation(format!(
        "refusing market sell with non-positive quantity {quantity}"
      )));
    }

    let fill = self.gateway.place_market_sell(&order.symbol, quantity).await?;

    let trade = Trade::executed(
      &order.symbol,
      TradeType::Sell,
      fill.executed_price,
      fill.executed_qty,
      fill.fee,
    );
    self.repository.insert_trade(&trade).await?;

    let filled = order.fill();
    self.repository.update_order(&filled, order.version).await?;
    self.metrics.liquidations.with_label_values(&[order.symbol.as_str()]).inc();

    Ok((fill.executed_qty, fill.executed_price))
  }
}
