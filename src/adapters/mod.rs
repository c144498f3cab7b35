//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP client, WebSockets, file I/O). Each
//! sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `exchange`: Binance REST gateway (signed requests, retries)
//! - `feeds`: real-time price ingestion over WebSocket
//! - `metrics`: Prometheus export, health probes, read endpoints
//! - `persistence`: JSONL logs and atomic order documents

pub mod exchange;
pub mod feeds;
pub mod metrics;
pub mod persistence;
