//! Trade Log - Append-only JSONL Fill Records
//!
//! Persists confirmed fills to daily JSONL files in the format
//! `trades/YYYY-MM-DD.jsonl`. Each line is a self-contained JSON record
//! for easy parsing, streaming, and crash recovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::domain::trade::Trade;

/// Append-only JSONL trade logger with daily file rotation.
pub struct TradeLog {
    /// Base directory for trade files.
    trades_dir: PathBuf,
}

impl TradeLog {
    /// Create a new trade log under the given data directory.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let trades_dir = Path::new(data_dir).join("trades");
        fs::create_dir_all(&trades_dir)
            .await
            .context("Failed to create trades directory")?;

        Ok(Self { trades_dir })
    }

    /// Append a trade record to its day's JSONL file.
    pub async fn append(&self, trade: &Trade) -> Result<()> {
        let date = trade.executed_at.format("%Y-%m-%d").to_string();
        let path = self.trades_dir.join(format!("{date}.jsonl"));

        let mut json =
            serde_json::to_string(trade).context("Failed to serialize trade record")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open trade log file")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write trade record")?;
        file.flush().await.context("Failed to flush trade log")?;

        Ok(())
    }

    /// Load all trade records from all daily files, oldest first.
    pub async fn load_all(&self) -> Result<Vec<Trade>> {
        let mut trades = Vec::new();
        let mut entries = fs::read_dir(&self.trades_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                let content = fs::read_to_string(&path).await?;
                for line in content.lines() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Trade>(line) {
                        Ok(record) => trades.push(record),
                        Err(e) => {
                            warn!(
                                file = %path.display(),
                                error = %e,
                                "Skipping malformed trade record"
                            );
                        }
                    }
                }
            }
        }

        trades.sort_by_key(|t| t.executed_at);
        info!(count = trades.len(), "Loaded trade records");
        Ok(trades)
    }

    /// Trades within a time range (inclusive), optionally one symbol only.
    pub async fn load_between(
        &self,
        symbol: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Trade>> {
        let all = self.load_all().await?;
        Ok(all
            .into_iter()
            .filter(|t| symbol.is_none_or(|s| t.symbol == s))
            .filter(|t| from.is_none_or(|f| t.executed_at >= f))
            .filter(|t| to.is_none_or(|u| t.executed_at <= u))
            .collect())
    }

    /// Most recent trades for a symbol, newest first.
    pub async fn recent(&self, symbol: &str, limit: usize) -> Result<Vec<Trade>> {
        let mut trades = self.load_between(Some(symbol), None, None).await?;
        trades.reverse();
        trades.truncate(limit);
        Ok(trades)
    }

    /// Check if the trades directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let test_path = self.trades_dir.join(".health_check");
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;
        result.is_ok()
    }
}
