//! Metrics and HTTP Surface - Observability and Read-only Endpoints
//!
//! - `prometheus`: counter registry for ingestion and cycle outcomes
//! - `health`: liveness/readiness state and the axum server exposing
//!   health probes, the profit report, and order/trade reads

pub mod health;
pub mod prometheus;

pub use health::{HealthState, HttpServer};
pub use prometheus::BotMetrics;
