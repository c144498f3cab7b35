//! Repository Port - State Persistence Interface
//!
//! Persistence traits for the three entities the bot owns: price ticks
//! (append-only), orders (single open slot per symbol, optimistic
//! versioning), and trades (append-only fill log). The usecases layer
//! only knows this trait, never files or serialization formats.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::order::Order;
use crate::domain::tick::PriceTick;
use crate::domain::trade::Trade;

/// Failure taxonomy for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
  /// An `Open` order already exists for the symbol.
  #[error("an open order already exists for {0}")]
  OpenOrderExists(String),
  /// The order's version did not match the stored one — a concurrent
  /// writer got there first. The caller must reload and re-decide.
  #[error("version conflict on order {id}: expected {expected}, stored {stored}")]
  VersionConflict { id: Uuid, expected: u64, stored: u64 },
  /// The order to update does not exist.
  #[error("order {0} not found")]
  OrderNotFound(Uuid),
  /// Underlying I/O or serialization failure.
  #[error("store i/o failure: {0}")]
  Io(#[from] anyhow::Error),
}

/// Trait for persistence providers.
///
/// Writers are exclusive per entity: the price feed appends ticks, the
/// order controller owns order and trade writes. Reads are shared.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
  /// Append a price tick.
  async fn insert_tick(&self, tick: &PriceTick) -> Result<(), StoreError>;

  /// Most recent tick for a symbol, by `observed_at`.
  async fn latest_tick(&self, symbol: &str) -> Result<Option<PriceTick>, StoreError>;

  /// The single open order for a symbol, if any.
  async fn find_open_order(&self, symbol: &str) -> Result<Option<Order>, StoreError>;

  /// Create a fresh order. Fails if the symbol already has an open one.
  async fn create_order(&self, order: &Order) -> Result<Order, StoreError>;

  /// Update an order if `expected_version` still matches the stored
  /// version; returns the persisted copy with the version bumped.
  async fn update_order(
    &self,
    order: &Order,
    expected_version: u64,
  ) -> Result<Order, StoreError>;

  /// Append an executed trade.
  async fn insert_trade(&self, trade: &Trade) -> Result<(), StoreError>;

  /// Trades for a symbol within a time range (inclusive). `None` bounds
  /// default to the beginning of time / now.
  async fn trades_between(
    &self,
    symbol: Option<&str>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
  ) -> Result<Vec<Trade>, StoreError>;

  /// Most recent trades for a symbol, newest first.
  async fn recent_trades(&self, symbol: &str, limit: usize) -> Result<Vec<Trade>, StoreError>;

  /// Check if the store is healthy (disk space, permissions).
  async fn is_healthy(&self) -> bool;
}
