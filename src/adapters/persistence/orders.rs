//! Order Store - Atomic JSON Order State with Optimistic Versioning
//!
//! Each symbol's order lives in `orders/{symbol}.json`, written atomically
//! (write to tmp file, then rename) so the file is always either the old
//! or the new version, never a partial write. Updates carry the caller's
//! expected version; a mismatch means another writer got there first and
//! the update is rejected instead of silently clobbered. Filled orders are
//! archived to `orders/history.jsonl` when a new cycle replaces them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::order::Order;
use crate::ports::repository::StoreError;

/// File-backed order store. One open-order slot per symbol.
pub struct OrderStore {
    /// Directory holding per-symbol order documents.
    orders_dir: PathBuf,
    /// In-memory view of the stored orders, keyed by symbol.
    /// The mutex also serializes all writes to the underlying files.
    slots: Mutex<HashMap<String, Order>>,
}

impl OrderStore {
    /// Create the store and recover existing order documents from disk.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let orders_dir = Path::new(data_dir).join("orders");
        fs::create_dir_all(&orders_dir)
            .await
            .context("Failed to create orders directory")?;

        let mut slots = HashMap::new();
        let mut entries = fs::read_dir(&orders_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let content = fs::read_to_string(&path).await?;
                match serde_json::from_str::<Order>(&content) {
                    Ok(order) => {
                        info!(symbol = %order.symbol, status = ?order.status, "Recovered order");
                        slots.insert(order.symbol.clone(), order);
                    }
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "Skipping unreadable order document");
                    }
                }
            }
        }

        Ok(Self {
            orders_dir,
            slots: Mutex::new(slots),
        })
    }

    fn symbol_path(&self, symbol: &str) -> PathBuf {
        self.orders_dir.join(format!("{symbol}.json"))
    }

    /// Persist an order document atomically (tmp → rename).
    async fn write_document(&self, order: &Order) -> Result<()> {
        let path = self.symbol_path(&order.symbol);
        let tmp = self.orders_dir.join(format!("{}.json.tmp", order.symbol));

        let json =
            serde_json::to_string_pretty(order).context("Failed to serialize order")?;
        fs::write(&tmp, &json)
            .await
            .context("Failed to write tmp order file")?;
        fs::rename(&tmp, &path)
            .await
            .context("Failed to rename order file")?;
        Ok(())
    }

    /// Archive a superseded order to the append-only history log.
    async fn archive(&self, order: &Order) -> Result<()> {
        let path = self.orders_dir.join("history.jsonl");
        let mut json = serde_json::to_string(order)?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(json.as_bytes()).await?;
        Ok(())
    }

    /// The open order for a symbol, if one exists.
    pub async fn find_open(&self, symbol: &str) -> Option<Order> {
        self.slots
            .lock()
            .await
            .get(symbol)
            .filter(|order| order.is_open())
            .cloned()
    }

    /// Create a fresh order in the symbol's slot.
    ///
    /// Fails with `OpenOrderExists` if the slot already holds an open
    /// order — the single-open-order invariant is enforced here, not by
    /// caller convention.
    pub async fn create(&self, order: &Order) -> Result<Order, StoreError> {
        let mut slots = self.slots.lock().await;

        if let Some(existing) = slots.get(&order.symbol) {
            if existing.is_open() {
                return Err(StoreError::OpenOrderExists(order.symbol.clone()));
            }
            // Superseded terminal order moves to the history log.
            self.archive(existing).await.map_err(StoreError::Io)?;
        }

        let mut stored = order.clone();
        stored.version = 0;
        self.write_document(&stored).await.map_err(StoreError::Io)?;
        slots.insert(stored.symbol.clone(), stored.clone());

        Ok(stored)
    }

    /// Update the stored order if `expected_version` still matches.
    pub async fn update(
        &self,
        order: &Order,
        expected_version: u64,
    ) -> Result<Order, StoreError> {
        let mut slots = self.slots.lock().await;

        let current = slots
            .get(&order.symbol)
            .filter(|stored| stored.id == order.id)
            .ok_or(StoreError::OrderNotFound(order.id))?;

        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: order.id,
                expected: expected_version,
                stored: current.version,
            });
        }

        let mut stored = order.clone();
        stored.version = expected_version + 1;
        self.write_document(&stored).await.map_err(StoreError::Io)?;
        slots.insert(stored.symbol.clone(), stored.clone());

        Ok(stored)
    }

    /// Check if the orders directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let test_path = self.orders_dir.join(".health_check");
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;
        result.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_create_then_find_open() {
        let dir = std::env::temp_dir().join(format!("trailstop-orders-{}", uuid::Uuid::new_v4()));
        let store = OrderStore::new(dir.to_str().unwrap()).await.unwrap();

        let order = Order::open("BTCUSDT", dec!(100), dec!(1));
        store.create(&order).await.unwrap();

        let found = store.find_open("BTCUSDT").await.unwrap();
        assert_eq!(found.id, order.id);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_second_open_order_rejected() {
        let dir = std::env::temp_dir().join(format!("trailstop-orders-{}", uuid::Uuid::new_v4()));
        let store = OrderStore::new(dir.to_str().unwrap()).await.unwrap();

        store
            .create(&Order::open("BTCUSDT", dec!(100), dec!(1)))
            .await
            .unwrap();
        let second = store
            .create(&Order::open("BTCUSDT", dec!(101), dec!(1)))
            .await;
        assert!(matches!(second, Err(StoreError::OpenOrderExists(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let dir = std::env::temp_dir().join(format!("trailstop-orders-{}", uuid::Uuid::new_v4()));
        let store = OrderStore::new(dir.to_str().unwrap()).await.unwrap();

        let created = store
            .create(&Order::open("BTCUSDT", dec!(100), dec!(1)))
            .await
            .unwrap();

        let raised = created.raise_watermark(dec!(105)).unwrap();
        let updated = store.update(&raised, created.version).await.unwrap();
        assert_eq!(updated.version, 1);

        // A writer still holding version 0 must be rejected.
        let stale = store.update(&raised, created.version).await;
        assert!(matches!(stale, Err(StoreError::VersionConflict { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
