//! Tick Log - Append-only JSONL Price Ticks
//!
//! Persists every accepted price tick to `ticks/{symbol}/YYYY-MM-DD.jsonl`
//! and keeps the most recent tick per symbol in memory so the controller's
//! "latest" query never has to scan a file on the hot path. On a cold
//! start the latest tick is recovered from the newest daily file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::tick::PriceTick;

/// Append-only JSONL tick log with an in-memory latest cache.
pub struct TickLog {
    /// Base directory for tick files.
    ticks_dir: PathBuf,
    /// Latest tick per symbol.
    latest: RwLock<HashMap<String, PriceTick>>,
}

impl TickLog {
    /// Create a new tick log under the given data directory.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let ticks_dir = Path::new(data_dir).join("ticks");
        fs::create_dir_all(&ticks_dir)
            .await
            .context("Failed to create ticks directory")?;

        Ok(Self {
            ticks_dir,
            latest: RwLock::new(HashMap::new()),
        })
    }

    /// Append a tick to the symbol's daily file and refresh the cache.
    pub async fn append(&self, tick: &PriceTick) -> Result<()> {
        let dir = self.ticks_dir.join(&tick.symbol);
        fs::create_dir_all(&dir)
            .await
            .context("Failed to create symbol tick directory")?;

        let date = tick.observed_at.format("%Y-%m-%d").to_string();
        let path = dir.join(format!("{date}.jsonl"));

        let mut json = serde_json::to_string(tick).context("Failed to serialize tick")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open tick log file")?;
        file.write_all(json.as_bytes())
            .await
            .context("Failed to write tick")?;
        file.flush().await.context("Failed to flush tick log")?;

        let mut latest = self.latest.write().await;
        match latest.get(&tick.symbol) {
            Some(existing) if existing.observed_at > tick.observed_at => {}
            _ => {
                latest.insert(tick.symbol.clone(), tick.clone());
            }
        }

        Ok(())
    }

    /// Latest tick for a symbol, from cache or recovered from disk.
    pub async fn latest(&self, symbol: &str) -> Result<Option<PriceTick>> {
        if let Some(tick) = self.latest.read().await.get(symbol) {
            return Ok(Some(tick.clone()));
        }

        let recovered = self.recover_latest(symbol).await?;
        if let Some(ref tick) = recovered {
            self.latest
                .write()
                .await
                .entry(symbol.to_string())
                .or_insert_with(|| tick.clone());
        }
        Ok(recovered)
    }

    /// Scan the newest daily file for the last valid tick.
    async fn recover_latest(&self, symbol: &str) -> Result<Option<PriceTick>> {
        let dir = self.ticks_dir.join(symbol);
        if !dir.exists() {
            return Ok(None);
        }

        // Daily file names sort lexicographically by date.
        let mut newest: Option<PathBuf> = None;
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jsonl")
                && newest.as_ref().is_none_or(|cur| path > *cur)
            {
                newest = Some(path);
            }
        }

        let Some(path) = newest else {
            return Ok(None);
        };

        let content = fs::read_to_string(&path).await?;
        let mut last = None;
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PriceTick>(line) {
                Ok(tick) => last = Some(tick),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Skipping malformed tick record");
                }
            }
        }

        if last.is_some() {
            info!(symbol, file = %path.display(), "Recovered latest tick from disk");
        }
        Ok(last)
    }

    /// Check if the ticks directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let test_path = self.ticks_dir.join(".health_check");
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;
        result.is_ok()
    }
}
