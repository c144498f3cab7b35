//! Prometheus Metrics Registry - Trading Observability
//!
//! Registers and exposes Prometheus counters for the price pipeline and
//! the order controller. All metrics follow the naming convention
//! `trailstop_*` and carry a symbol label for multi-symbol filtering.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Centralized Prometheus metrics for the bot.
pub struct BotMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Ticks accepted and persisted.
    pub ticks_ingested: IntCounterVec,
    /// Ticks discarded as malformed or non-positive.
    pub ticks_rejected: IntCounterVec,
    /// Feed reconnect attempts scheduled.
    pub feed_reconnects: IntCounterVec,
    /// Run-cycles completed, by outcome.
    pub cycles_completed: IntCounterVec,
    /// Stop orders cancelled and re-placed.
    pub stop_adjustments: IntCounterVec,
    /// Positions liquidated on retracement.
    pub liquidations: IntCounterVec,
}

impl BotMetrics {
    /// Create and register all metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let ticks_ingested = IntCounterVec::new(
            Opts::new("trailstop_ticks_ingested_total", "Price ticks persisted"),
            &["symbol"],
        )?;
        let ticks_rejected = IntCounterVec::new(
            Opts::new(
                "trailstop_ticks_rejected_total",
                "Price ticks discarded as malformed or non-positive",
            ),
            &["symbol"],
        )?;
        let feed_reconnects = IntCounterVec::new(
            Opts::new(
                "trailstop_feed_reconnects_total",
                "Feed reconnect attempts scheduled",
            ),
            &["symbol"],
        )?;
        let cycles_completed = IntCounterVec::new(
            Opts::new(
                "trailstop_cycles_completed_total",
                "Run-cycles completed, by outcome",
            ),
            &["symbol", "outcome"],
        )?;
        let stop_adjustments = IntCounterVec::new(
            Opts::new(
                "trailstop_stop_adjustments_total",
                "Stop orders cancelled and re-placed higher",
            ),
            &["symbol"],
        )?;
        let liquidations = IntCounterVec::new(
            Opts::new(
                "trailstop_liquidations_total",
                "Positions market-sold on retracement",
            ),
            &["symbol"],
        )?;

        registry.register(Box::new(ticks_ingested.clone()))?;
        registry.register(Box::new(ticks_rejected.clone()))?;
        registry.register(Box::new(feed_reconnects.clone()))?;
        registry.register(Box::new(cycles_completed.clone()))?;
        registry.register(Box::new(stop_adjustments.clone()))?;
        registry.register(Box::new(liquidations.clone()))?;

        Ok(Self {
            registry,
            ticks_ingested,
            ticks_rejected,
            feed_reconnects,
            cycles_completed,
            stop_adjustments,
            liquidations,
        })
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder
            .encode(&self.registry.gather(), &mut buffer)
            .is_err()
        {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
