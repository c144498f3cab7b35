//! Price Feed Adapters - Real-time Price Streaming
//!
//! Provides the WebSocket-based price ingestion pipeline:
//! - `binance_ws`: per-symbol trade stream, validation, tick persistence
//! - `backoff`: multiplicative reconnect delay with cap and retry budget
//! - `supervisor`: feed lifecycle, health aggregation, fatal surfacing

pub mod backoff;
pub mod binance_ws;
pub mod supervisor;

pub use binance_ws::PriceFeed;
pub use supervisor::FeedSupervisor;
