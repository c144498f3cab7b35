//! Trailing-Stop Bot — Entry Point
//!
//! Initializes configuration, logging, the exchange gateway, and the
//! price/order tasks. Runs until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Load exchange credentials from env (EXCHANGE_API_KEY/_SECRET)
//! 4. Create signed REST client + Binance gateway
//! 5. Open the file-backed repository
//! 6. Spawn the HTTP surface (/live, /ready, /profit, /metrics, ...)
//! 7. Spawn one WebSocket price feed per symbol (supervised)
//! 8. Spawn the per-symbol run-cycle schedulers
//! 9. Wait for SIGINT → graceful shutdown (signal→drain→exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use trailstop::adapters::exchange::auth::ExchangeAuth;
use trailstop::adapters::exchange::client::{RestClient, RestClientConfig};
use trailstop::adapters::exchange::BinanceGateway;
use trailstop::adapters::feeds::FeedSupervisor;
use trailstop::adapters::metrics::health::ApiState;
use trailstop::adapters::metrics::{BotMetrics, HealthState, HttpServer};
use trailstop::adapters::persistence::FileRepository;
use trailstop::config;
use trailstop::usecases::{CycleScheduler, OrderController, ProfitReporter};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config =
        config::loader::load_config(&config_path).context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.bot.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.bot.name,
        version = env!("CARGO_PKG_VERSION"),
        symbols = config.symbols.len(),
        cycle_secs = config.controller.cycle_interval_secs,
        "Starting trailing-stop bot"
    );

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Exchange gateway (credentials from env) ──────────
    let auth = Arc::new(
        ExchangeAuth::from_env().context("Failed to load exchange credentials from env")?,
    );
    let rest_config = RestClientConfig {
        base_url: config.exchange.rest_url.clone(),
        timeout: std::time::Duration::from_millis(config.exchange.timeout_ms),
        max_retries: config.exchange.max_retries,
        retry_base_delay: std::time::Duration::from_millis(config.exchange.retry_base_delay_ms),
    };
    let client = Arc::new(
        RestClient::new(Arc::clone(&auth), rest_config)
            .context("Failed to create exchange REST client")?,
    );
    let gateway = Arc::new(BinanceGateway::new(client));

    // ── 5. File-backed repository ───────────────────────────
    let repository = Arc::new(
        FileRepository::from_data_dir(&config.persistence.data_dir)
            .await
            .context("Failed to open data directory")?,
    );

    // ── 6. Metrics, health state, HTTP surface ──────────────
    let metrics = Arc::new(BotMetrics::new().context("Failed to register metrics")?);
    let health = Arc::new(HealthState::new());
    let reporter = Arc::new(ProfitReporter::new(Arc::clone(&repository)));

    let server = HttpServer::new(
        ApiState {
            health: Arc::clone(&health),
            repository: Arc::clone(&repository),
            reporter,
            metrics: Arc::clone(&metrics),
        },
        config.server.bind_address.clone(),
        config.server.port,
    );
    let server_handle = tokio::spawn({
        let shutdown_rx = shutdown_tx.subscribe();
        async move {
            if let Err(e) = server.run(shutdown_rx).await {
                error!(error = %e, "HTTP server failed");
            }
        }
    });

    // ── 7. Price feeds (one per symbol, supervised) ─────────
    let supervisor = FeedSupervisor::new(
        &config,
        Arc::clone(&repository),
        Arc::clone(&health),
        Arc::clone(&metrics),
        shutdown_tx.clone(),
    );
    let feed_handles = supervisor.spawn();

    // ── 8. Order controller + schedulers ────────────────────
    let controller = Arc::new(OrderController::new(
        &config,
        gateway,
        Arc::clone(&repository),
        Arc::clone(&metrics),
    ));
    let scheduler = CycleScheduler::new(&config, controller, shutdown_tx.clone());
    let scheduler_handles = scheduler.spawn();

    info!("All tasks spawned — bot is running");

    // ── 9. Wait for SIGINT ──────────────────────────────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
    }

    // Readiness goes 503 first so orchestrators stop routing.
    health.mark_shutting_down();

    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast to all tasks");

    // Schedulers finish their in-flight cycle before exiting.
    for handle in scheduler_handles {
        if tokio::time::timeout(std::time::Duration::from_secs(30), handle)
            .await
            .is_err()
        {
            warn!("Scheduler did not stop within 30s");
        }
    }

    for handle in feed_handles {
        if tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .is_err()
        {
            warn!("Feed did not stop within 5s");
        }
    }

    server_handle.abort();

    info!("Shutdown complete");
    Ok(())
}
