//! Exchange Gateway Port - Discrete Exchange Command Interface
//!
//! The order controller never touches the streaming channel; everything it
//! needs from the exchange goes through these synchronous-looking calls.
//! Every failure is typed so callers can tell transient conditions (retry
//! next cycle) from fatal ones (surface to the supervisor) — asserting on
//! outcomes, not log lines.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// Failure taxonomy for gateway calls.
#[derive(Debug, Error)]
pub enum GatewayError {
  /// Network timeout, rate limit, or 5xx — safe to retry later.
  #[error("transient exchange failure: {0}")]
  Transient(String),
  /// The exchange understood the request and refused it.
  #[error("order rejected: {0}")]
  Rejected(String),
  /// Authentication or request construction failure — will not heal on retry.
  #[error("fatal exchange failure: {0}")]
  Fatal(String),
  /// The exchange answered with a payload we could not interpret.
  #[error("invalid exchange response: {0}")]
  InvalidResponse(String),
}

impl GatewayError {
  /// Whether retrying the same call later could succeed.
  pub fn is_transient(&self) -> bool {
    matches!(self, Self::Transient(_))
  }
}

/// Fill details of an executed market sell.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSellFill {
  /// Quantity actually executed.
  pub executed_qty: Decimal,
  /// Average execution price.
  pub executed_price: Decimal,
  /// Total fee charged.
  pub fee: Decimal,
}

/// Trait for exchange command providers.
///
/// Implementors own API credentials, request signing, and retry policy.
/// All prices and quantities are `Decimal` end to end.
#[async_trait]
pub trait ExchangeGateway: Send + Sync + 'static {
  /// Current market price for a symbol (REST ticker, not the stream).
  async fn get_current_price(&self, symbol: &str) -> Result<Decimal, GatewayError>;

  /// Free balance of a base asset (e.g., "BTC" — explicit, never derived
  /// by slicing the pair symbol).
  async fn get_held_quantity(&self, asset: &str) -> Result<Decimal, GatewayError>;

  /// Cancel an open exchange order.
  async fn cancel_order(
    &self,
    symbol: &str,
    exchange_order_id: &str,
  ) -> Result<(), GatewayError>;

  /// Place a stop-limit sell; returns the exchange-assigned order ID.
  async fn place_stop_order(
    &self,
    symbol: &str,
    quantity: Decimal,
    stop_price: Decimal,
    limit_price: Decimal,
  ) -> Result<String, GatewayError>;

  /// Market-sell the full quantity; returns the confirmed fill.
  async fn place_market_sell(
    &self,
    symbol: &str,
    quantity: Decimal,
  ) -> Result<MarketSellFill, GatewayError>;

  /// Check if the gateway connection is healthy.
  async fn is_healthy(&self) -> bool;
}
