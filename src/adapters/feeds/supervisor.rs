//! Feed Supervisor - Lifecycle Management for Price Feed Tasks
//!
//! Spawns one `PriceFeed` task per active symbol and aggregates their
//! health for the readiness probe. A feed that exhausts its reconnect
//! budget is a fatal condition: the supervisor marks the system not
//! ready and leaves the feed down — it requires external intervention,
//! not a silent restart.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use super::binance_ws::PriceFeed;
use crate::adapters::metrics::{BotMetrics, HealthState};
use crate::config::AppConfig;
use crate::ports::repository::Repository;

/// Connection state of a single feed task, shared with the feed itself.
#[derive(Debug)]
pub struct FeedHealth {
    /// Symbol for logging.
    symbol: String,
    /// Whether the feed currently holds an established connection.
    connected: AtomicBool,
    /// Whether the feed has stopped permanently.
    fatal: AtomicBool,
}

impl FeedHealth {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            connected: AtomicBool::new(false),
            fatal: AtomicBool::new(false),
        }
    }

    pub(crate) fn mark_connected(&self) {
        self.connected.store(true, Ordering::Relaxed);
    }

    pub(crate) fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    /// Whether the feed currently holds a connection.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Whether the feed has stopped for good.
    pub fn is_fatal(&self) -> bool {
        self.fatal.load(Ordering::Relaxed)
    }

    /// Symbol this tracker belongs to.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

/// Supervises all price feed tasks.
pub struct FeedSupervisor<R: Repository> {
    /// One feed per active symbol, paired with its health tracker.
    feeds: Vec<(Arc<PriceFeed<R>>, Arc<FeedHealth>)>,
    /// Shutdown broadcaster.
    shutdown_tx: broadcast::Sender<()>,
    /// Shared readiness state for the HTTP probes.
    health_state: Arc<HealthState>,
}

impl<R: Repository> FeedSupervisor<R> {
    /// Build feeds for every active symbol in the configuration.
    pub fn new(
        config: &AppConfig,
        repository: Arc<R>,
        health_state: Arc<HealthState>,
        metrics: Arc<BotMetrics>,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        let feeds = config
            .symbols
            .iter()
            .filter(|s| s.active)
            .map(|s| {
                let health = Arc::new(FeedHealth::new(&s.symbol));
                let feed = Arc::new(PriceFeed::new(
                    s.symbol.clone(),
                    &config.exchange.ws_url_template,
                    config.feed.clone(),
                    Arc::clone(&repository),
                    Arc::clone(&health),
                    Arc::clone(&metrics),
                ));
                (feed, health)
            })
            .collect();

        Self {
            feeds,
            shutdown_tx,
            health_state,
        }
    }

    /// Spawn all feed tasks and return join handles.
    ///
    /// Each feed runs in its own tokio task with independent reconnection
    /// state; one symbol's backoff never stalls another's ingestion.
    #[instrument(skip(self))]
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.feeds.len());

        for (feed, health) in &self.feeds {
            let feed = Arc::clone(feed);
            let health = Arc::clone(health);
            let health_state = Arc::clone(&self.health_state);
            let shutdown_rx = self.shutdown_tx.subscribe();

            handles.push(tokio::spawn(async move {
                match feed.run(shutdown_rx).await {
                    Ok(()) => info!(symbol = health.symbol(), "Price feed exited normally"),
                    Err(e) => {
                        error!(symbol = health.symbol(), error = %e, "Price feed stopped permanently");
                        health.fatal.store(true, Ordering::Relaxed);
                        health.mark_disconnected();
                        health_state.mark_feeds_down();
                    }
                }
            }));
        }

        info!(feed_count = handles.len(), "Feed tasks spawned");
        handles
    }

    /// True while no feed has gone fatally down.
    pub fn is_healthy(&self) -> bool {
        self.feeds.iter().all(|(_, health)| !health.is_fatal())
    }

    /// True when every feed holds a live connection.
    pub fn is_fully_connected(&self) -> bool {
        self.feeds.iter().all(|(_, health)| health.is_connected())
    }

    /// Health trackers, for logging and diagnostics.
    pub fn feed_health(&self) -> Vec<Arc<FeedHealth>> {
        self.feeds.iter().map(|(_, h)| Arc::clone(h)).collect()
    }
}
