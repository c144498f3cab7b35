//! Cycle Scheduler - Fixed-period Run-Cycle Driver
//!
//! One tokio interval per active symbol invokes the controller's
//! `run_cycle`. Cycle failures are logged with symbol context and never
//! crash the process — state was left unchanged, so the next tick simply
//! tries again. Missed ticks are skipped, not bursted.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument};

use super::controller::OrderController;
use crate::config::AppConfig;
use crate::ports::exchange::ExchangeGateway;
use crate::ports::repository::Repository;

/// Drives periodic run-cycles for every active symbol.
pub struct CycleScheduler<G: ExchangeGateway, R: Repository> {
  /// The controller all cycles run through.
  controller: Arc<OrderController<G, R>>,
  /// Symbols to schedule.
  symbols: Vec<String>,
  /// Seconds between cycles per symbol.
  interval: Duration,
  /// Shutdown broadcaster.
  shutdown_tx: broadcast::Sender<()>,
}

impl<G: ExchangeGateway, R: Repository> CycleScheduler<G, R> {
  /// Build a scheduler over the active symbols.
  pub fn new(
    config: &AppConfig,
    controller: Arc<OrderController<G, R>>,
    shutdown_tx: broadcast::Sender<()>,
  ) -> Self {
    Self {
      controller,
      symbols: config
        .symbols
        .iter()
        .filter(|s| s.active)
        .map(|s| s.symbol.clone())
        .collect(),
      interval: Duration::from_secs(config.controller.cycle_interval_secs),
      shutdown_tx,
    }
  }

  /// Spawn one timer task per symbol and return the handles.
  #[instrument(skip(self))]
  pub fn spawn(&self) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(self.symbols.len());

    for symbol in &self.symbols {
      let symbol = symbol.clone();
      let controller = Arc::clone(&self.controller);
      let mut shutdown_rx = self.shutdown_tx.subscribe();
      let period = self.interval;

      handles.push(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
          tokio::select! {
            _ = shutdown_rx.recv() => {
              info!(symbol, "Scheduler stopping");
              return;
            }
            _ = ticker.tick() => {
              match controller.run_cycle(&symbol).await {
                Ok(outcome) => {
                  tracing::debug!(symbol, outcome = outcome.label(), "Run-cycle finished");
                }
                Err(e) => {
                  // The guard released and state is unchanged; the
                  // next tick retries.
                  error!(symbol, error = %e, "Run-cycle failed");
                }
              }
            }
          }
        }
      }));
    }

    info!(
      symbols = handles.len(),
      interval_secs = self.interval.as_secs(),
      "Cycle schedulers spawned"
    );
    handles
  }
}
