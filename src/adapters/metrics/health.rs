//! Health and Read Endpoints - Liveness, Readiness, Profit, Order Reads
//!
//! Axum server exposing the read-only surface of the bot:
//! - `/live` and `/ready` probes for orchestrators
//! - `/health/store` writability check of the persistent store
//! - `/profit` realized P&L over recorded trades
//! - `/orders/{symbol}` and `/trades/{symbol}` read-only state
//! - `/metrics` Prometheus text exposition
//!
//! All routes are pure queries with no side effects on the core.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{info, instrument};

use super::prometheus::BotMetrics;
use crate::ports::repository::Repository;
use crate::usecases::reporter::ProfitReporter;

/// Shared health state polled by readiness probes.
#[derive(Debug)]
pub struct HealthState {
    /// False once any feed has gone fatally down.
    feeds_healthy: AtomicBool,
    /// True while graceful shutdown is in progress.
    shutting_down: AtomicBool,
}

impl HealthState {
    /// Create a new health state (healthy by default).
    pub fn new() -> Self {
        Self {
            feeds_healthy: AtomicBool::new(true),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Record that a feed stopped permanently.
    pub fn mark_feeds_down(&self) {
        self.feeds_healthy.store(false, Ordering::Relaxed);
    }

    /// Flip readiness off for graceful shutdown.
    pub fn mark_shutting_down(&self) {
        self.shutting_down.store(true, Ordering::Relaxed);
    }

    /// Check if the system is ready to serve traffic.
    pub fn is_ready(&self) -> bool {
        self.feeds_healthy.load(Ordering::Relaxed) && !self.shutting_down.load(Ordering::Relaxed)
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state handed to every request handler.
pub struct ApiState<R: Repository> {
    /// Readiness flags.
    pub health: Arc<HealthState>,
    /// Read-only store access.
    pub repository: Arc<R>,
    /// P&L aggregation.
    pub reporter: Arc<ProfitReporter<R>>,
    /// Prometheus registry.
    pub metrics: Arc<BotMetrics>,
}

impl<R: Repository> Clone for ApiState<R> {
    fn clone(&self) -> Self {
        Self {
            health: Arc::clone(&self.health),
            repository: Arc::clone(&self.repository),
            reporter: Arc::clone(&self.reporter),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Query parameters for the profit endpoint.
#[derive(Debug, Deserialize)]
struct ProfitQuery {
    symbol: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

/// Query parameters for the trade history endpoint.
#[derive(Debug, Deserialize)]
struct TradesQuery {
    limit: Option<usize>,
}

/// Axum-based HTTP server for the read-only surface.
pub struct HttpServer<R: Repository> {
    state: ApiState<R>,
    bind_address: String,
    port: u16,
}

impl<R: Repository> HttpServer<R> {
    /// Create a new server over the shared state.
    pub fn new(state: ApiState<R>, bind_address: impl Into<String>, port: u16) -> Self {
        Self {
            state,
            bind_address: bind_address.into(),
            port,
        }
    }

    /// Serve until the shutdown signal fires.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .route("/health/store", get(Self::store_health))
            .route("/profit", get(Self::profit))
            .route("/orders/:symbol", get(Self::open_order))
            .route("/trades/:symbol", get(Self::trade_history))
            .route("/metrics", get(Self::metrics))
            .with_state(self.state);

        let addr = format!("{}:{}", self.bind_address, self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "HTTP server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always 200 while the process runs.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness probe: 503 once a feed died or shutdown began.
    async fn readiness(State(state): State<ApiState<R>>) -> impl IntoResponse {
        if state.health.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }

    /// Store writability probe.
    async fn store_health(State(state): State<ApiState<R>>) -> impl IntoResponse {
        if state.repository.is_healthy().await {
            (StatusCode::OK, "store connection is healthy")
        } else {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "store connection failed",
            )
        }
    }

    /// Realized P&L over recorded trades.
    async fn profit(
        State(state): State<ApiState<R>>,
        Query(query): Query<ProfitQuery>,
    ) -> impl IntoResponse {
        match state
            .reporter
            .realized(query.symbol.as_deref(), query.from, query.to)
            .await
        {
            Ok(report) => Json(report).into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }

    /// Latest order state for a symbol.
    async fn open_order(
        State(state): State<ApiState<R>>,
        Path(symbol): Path<String>,
    ) -> impl IntoResponse {
        match state.repository.find_open_order(&symbol).await {
            Ok(Some(order)) => Json(order).into_response(),
            Ok(None) => (
                StatusCode::NOT_FOUND,
                format!("no open order for {symbol}"),
            )
                .into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }

    /// Recent trade history for a symbol, newest first.
    async fn trade_history(
        State(state): State<ApiState<R>>,
        Path(symbol): Path<String>,
        Query(query): Query<TradesQuery>,
    ) -> impl IntoResponse {
        let limit = query.limit.unwrap_or(100);
        match state.repository.recent_trades(&symbol, limit).await {
            Ok(trades) => Json(trades).into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }

    /// Prometheus text exposition.
    async fn metrics(State(state): State<ApiState<R>>) -> impl IntoResponse {
        (StatusCode::OK, state.metrics.render())
    }
}
