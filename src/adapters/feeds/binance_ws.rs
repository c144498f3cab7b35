//! Binance WebSocket Price Feed - Per-symbol Trade Stream Ingestion
//!
//! Maintains one streaming connection to the exchange trade channel for a
//! single symbol. Every message is parsed, validated, and persisted as a
//! `PriceTick`; malformed payloads and non-positive prices are noise and
//! are dropped before they can reach the store. Transport errors close
//! the connection and feed the reconnect schedule — a fresh connection
//! resets it. An exhausted retry budget stops the feed permanently.

use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument, warn};

use super::backoff::Backoff;
use super::supervisor::FeedHealth;
use crate::adapters::metrics::BotMetrics;
use crate::config::FeedConfig;
use crate::domain::tick::PriceTick;
use crate::ports::repository::Repository;

/// Terminal feed failure, surfaced to the supervisor.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The reconnect budget ran out; the feed will not self-heal.
    #[error("reconnect retries exhausted for {symbol} after {attempts} attempts")]
    RetriesExhausted { symbol: String, attempts: u32 },
}

/// Exchange trade stream message. Only the price field matters here;
/// everything else rides along for debugging.
#[derive(Debug, Deserialize)]
struct TradeMsg {
    /// Price as a decimal string.
    p: String,
}

/// Why a single connection session ended.
enum SessionEnd {
    /// Shutdown signal received; do not reconnect.
    Shutdown,
    /// Transport closed or errored; reconnect if budget allows.
    Disconnected(String),
}

/// Streaming price feed for one symbol.
pub struct PriceFeed<R: Repository> {
    /// Symbol this feed ingests (e.g., "BTCUSDT").
    symbol: String,
    /// Fully resolved WebSocket URL for this symbol's trade channel.
    ws_url: String,
    /// Reconnect configuration.
    config: FeedConfig,
    /// Tick persistence.
    repository: Arc<R>,
    /// Connection state shared with the supervisor.
    health: Arc<FeedHealth>,
    /// Ingestion counters.
    metrics: Arc<BotMetrics>,
}

impl<R: Repository> PriceFeed<R> {
    /// Create a feed for one symbol. The URL template's `{symbol}`
    /// placeholder is resolved with the lowercased pair symbol.
    pub fn new(
        symbol: impl Into<String>,
        ws_url_template: &str,
        config: FeedConfig,
        repository: Arc<R>,
        health: Arc<FeedHealth>,
        metrics: Arc<BotMetrics>,
    ) -> Self {
        let symbol = symbol.into();
        let ws_url = ws_url_template.replace("{symbol}", &symbol.to_lowercase());
        Self {
            symbol,
            ws_url,
            config,
            repository,
            health,
            metrics,
        }
    }

    /// Run the connection loop until shutdown or retry exhaustion.
    ///
    /// The backoff sleep suspends only this feed's task; feeds for other
    /// symbols run independently.
    #[instrument(skip(self, shutdown_rx), fields(symbol = %self.symbol))]
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<(), FeedError> {
        let mut backoff = Backoff::new(&self.config);

        loop {
            match self.connect_and_stream(&mut backoff, &mut shutdown_rx).await {
                Ok(SessionEnd::Shutdown) => {
                    info!("Price feed shut down gracefully");
                    return Ok(());
                }
                Ok(SessionEnd::Disconnected(reason)) | Err(reason) => {
                    self.health.mark_disconnected();

                    let Some(delay) = backoff.next_delay() else {
                        return Err(FeedError::RetriesExhausted {
                            symbol: self.symbol.clone(),
                            attempts: backoff.retries_used(),
                        });
                    };

                    warn!(
                        %reason,
                        delay_ms = delay.as_millis(),
                        retries_used = backoff.retries_used(),
                        "Feed disconnected, scheduling reconnect"
                    );
                    self.metrics.feed_reconnects.with_label_values(&[self.symbol.as_str()]).inc();

                    // The delay itself must stay interruptible by shutdown.
                    tokio::select! {
                        _ = shutdown_rx.recv() => return Ok(()),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Single connection session: connect, stream, exit on error or shutdown.
    ///
    /// Returns `Err` when the connection never established, `Ok(end)` once
    /// an established session terminated.
    async fn connect_and_stream(
        &self,
        backoff: &mut Backoff,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<SessionEnd, String> {
        let (ws_stream, _) = connect_async(self.ws_url.as_str())
            .await
            .map_err(|e| format!("connection failed: {e}"))?;

        // Connected: the retry counter and delay return to base.
        backoff.reset();
        self.health.mark_connected();
        info!(url = %self.ws_url, "Price feed connected");

        let (_write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    return Ok(SessionEnd::Shutdown);
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_message(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            // Pong is handled automatically by tungstenite.
                            debug!(len = data.len(), "Ping received");
                        }
                        Some(Ok(Message::Close(frame))) => {
                            return Ok(SessionEnd::Disconnected(format!(
                                "server closed connection: {frame:?}"
                            )));
                        }
                        Some(Err(e)) => {
                            // A transport error is never terminal on its
                            // own — it feeds the reconnect schedule.
                            return Ok(SessionEnd::Disconnected(format!("transport error: {e}")));
                        }
                        None => {
                            return Ok(SessionEnd::Disconnected("stream ended".to_string()));
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Parse, validate, and persist one trade message.
    ///
    /// Bad payloads are logged and dropped; they never become ticks and
    /// never tear down the connection.
    async fn handle_message(&self, text: &str) {
        let price = match serde_json::from_str::<TradeMsg>(text)
            .map_err(|e| e.to_string())
            .and_then(|msg| msg.p.parse::<Decimal>().map_err(|e| e.to_string()))
        {
            Ok(price) => price,
            Err(error) => {
                warn!(symbol = %self.symbol, %error, "Discarding malformed trade message");
                self.metrics.ticks_rejected.with_label_values(&[self.symbol.as_str()]).inc();
                return;
            }
        };

        let tick = match PriceTick::record(&self.symbol, price, Utc::now()) {
            Ok(tick) => tick,
            Err(error) => {
                warn!(symbol = %self.symbol, %error, "Discarding invalid price");
                self.metrics.ticks_rejected.with_label_values(&[self.symbol.as_str()]).inc();
                return;
            }
        };

        match self.repository.insert_tick(&tick).await {
            Ok(()) => {
                self.metrics.ticks_ingested.with_label_values(&[self.symbol.as_str()]).inc();
                debug!(symbol = %self.symbol, price = %tick.price, "Tick persisted");
            }
            Err(error) => {
                warn!(symbol = %self.symbol, %error, "Failed to persist tick");
            }
        }
    }
}
