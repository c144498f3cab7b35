//! Exchange Adapter - Binance REST Gateway
//!
//! Implements the `ExchangeGateway` port against the Binance spot REST
//! API:
//! - `auth`: HMAC-SHA256 query signing with credentials from env
//! - `client`: rate-aware HTTP client with retry and typed failures
//! - `gateway`: the port implementation (price, balance, orders)

pub mod auth;
pub mod client;
pub mod gateway;

pub use gateway::BinanceGateway;
