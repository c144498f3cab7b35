//! Repository Implementation — Concrete Adapter for the Repository Port
//!
//! Wraps `TickLog`, `OrderStore`, and `TradeLog` into a single struct that
//! implements the `Repository` trait from `crate::ports::repository`.
//!
//! This is the hexagonal architecture glue: the usecases layer only knows
//! about the `Repository` trait, never about files or JSON.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::orders::OrderStore;
use super::ticks::TickLog;
use super::trades::TradeLog;
use crate::domain::order::Order;
use crate::domain::tick::PriceTick;
use crate::domain::trade::Trade;
use crate::ports::repository::{Repository, StoreError};

/// Concrete repository adapter combining tick, order, and trade storage.
pub struct FileRepository {
    /// Append-only tick log with latest cache.
    ticks: TickLog,
    /// Atomic per-symbol order documents.
    orders: OrderStore,
    /// JSONL fill log.
    trades: TradeLog,
}

impl FileRepository {
    /// Initialize all three stores under a data directory.
    pub async fn from_data_dir(data_dir: &str) -> Result<Self> {
        Ok(Self {
            ticks: TickLog::new(data_dir).await?,
            orders: OrderStore::new(data_dir).await?,
            trades: TradeLog::new(data_dir).await?,
        })
    }
}

#[async_trait]
impl Repository for FileRepository {
    async fn insert_tick(&self, tick: &PriceTick) -> Result<(), StoreError> {
        self.ticks.append(tick).await.map_err(StoreError::Io)
    }

    async fn latest_tick(&self, symbol: &str) -> Result<Option<PriceTick>, StoreError> {
        self.ticks.latest(symbol).await.map_err(StoreError::Io)
    }

    async fn find_open_order(&self, symbol: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.find_open(symbol).await)
    }

    async fn create_order(&self, order: &Order) -> Result<Order, StoreError> {
        self.orders.create(order).await
    }

    async fn update_order(
        &self,
        order: &Order,
        expected_version: u64,
    ) -> Result<Order, StoreError> {
        self.orders.update(order, expected_version).await
    }

    async fn insert_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        self.trades.append(trade).await.map_err(StoreError::Io)
    }

    async fn trades_between(
        &self,
        symbol: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Trade>, StoreError> {
        self.trades
            .load_between(symbol, from, to)
            .await
            .map_err(StoreError::Io)
    }

    async fn recent_trades(&self, symbol: &str, limit: usize) -> Result<Vec<Trade>, StoreError> {
        self.trades.recent(symbol, limit).await.map_err(StoreError::Io)
    }

    async fn is_healthy(&self) -> bool {
        self.ticks.is_healthy().await
            && self.orders.is_healthy().await
            && self.trades.is_healthy().await
    }
}
