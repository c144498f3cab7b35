//! Trailing-stop order entity and its state machine.
//!
//! At most one `Open` order exists per symbol. The order advances through
//! snapshot transitions — each method returns a new value instead of
//! mutating shared state, so a run-cycle always works against an explicit
//! snapshot and nothing is persisted halfway.
//!
//! State machine:
//! ```text
//! (absent) ──create──▶ Open ──watermark/adjust──▶ Open
//!                       │
//!                       └──retracement──▶ Filled (terminal)
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a trailing-stop order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Live: watermark and stop are being tracked.
    Open,
    /// An exchange cancel/replace round-trip is in flight.
    /// In-memory only — never persisted.
    Adjusting,
    /// Position liquidated. Terminal and immutable.
    Filled,
}

/// A single trailing-stop sell order for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Internal order ID.
    pub id: Uuid,
    /// Trading pair symbol this order protects.
    pub symbol: String,
    /// Current stop trigger price.
    pub stop_price: Decimal,
    /// Highest price observed since the order opened. Never regresses.
    pub highest_observed_price: Decimal,
    /// Exchange-assigned order ID, once a stop order has been placed.
    pub exchange_order_id: Option<String>,
    /// Held quantity the order protects.
    pub quantity: Decimal,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Optimistic-concurrency version, bumped by the store on update.
    pub version: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Open a fresh order seeded from the live exchange price.
    ///
    /// Both the stop and the watermark start at the current price;
    /// no exchange order exists yet.
    pub fn open(symbol: impl Into<String>, current_price: Decimal, quantity: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            stop_price: current_price,
            highest_observed_price: current_price,
            exchange_order_id: None,
            quantity,
            status: OrderStatus::Open,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this order is still live.
    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    /// Raise the watermark to `latest` if it is a new high.
    ///
    /// Returns `None` when the order is not open or the watermark would
    /// not move — the watermark is monotonically non-decreasing.
    pub fn raise_watermark(&self, latest: Decimal) -> Option<Self> {
        if !self.is_open() || latest <= self.highest_observed_price {
            return None;
        }
        let mut next = self.clone();
        next.highest_observed_price = latest;
        next.updated_at = Utc::now();
        Some(next)
    }

    /// Mark the order as mid-adjustment while the exchange round-trip runs.
    pub fn begin_adjustment(&self) -> Self {
        let mut next = self.clone();
        next.status = OrderStatus::Adjusting;
        next
    }

    /// Complete a stop adjustment: new stop, new exchange order, back to open.
    pub fn complete_adjustment(&self, new_stop: Decimal, exchange_order_id: String) -> Self {
        let mut next = self.clone();
        next.stop_price = new_stop;
        next.exchange_order_id = Some(exchange_order_id);
        next.status = OrderStatus::Open;
        next.updated_at = Utc::now();
        next
    }

    /// Transition to `Filled` after a confirmed liquidation. Terminal.
    pub fn fill(&self) -> Self {
        let mut next = self.clone();
        next.status = OrderStatus::Filled;
        next.updated_at = Utc::now();
        next
    }
}
