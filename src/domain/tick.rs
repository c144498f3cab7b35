//! Price tick entity.
//!
//! A single observed market price for a symbol. Ticks are immutable and
//! append-only; the "latest" tick is the one with the greatest
//! `observed_at`. Non-positive prices never become ticks — they are
//! rejected at construction so a bad payload cannot reach the store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejection reason for a price that cannot form a tick.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TickError {
    /// Price was zero or negative. Treated as feed noise, not a fault.
    #[error("non-positive price {0} for {1}")]
    NonPositivePrice(Decimal, String),
}

/// One observed market price, timestamped at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    /// Trading pair symbol (e.g., "BTCUSDT").
    pub symbol: String,
    /// Observed trade price. Always positive.
    pub price: Decimal,
    /// Ingestion timestamp. Ordering key for "latest" queries.
    pub observed_at: DateTime<Utc>,
}

impl PriceTick {
    /// Build a tick from a validated price observation.
    ///
    /// # Errors
    /// Returns `TickError::NonPositivePrice` for price <= 0.
    pub fn record(
        symbol: impl Into<String>,
        price: Decimal,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, TickError> {
        let symbol = symbol.into();
        if price <= Decimal::ZERO {
            return Err(TickError::NonPositivePrice(price, symbol));
        }
        Ok(Self {
            symbol,
            price,
            observed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_positive_price_accepted() {
        let tick = PriceTick::record("BTCUSDT", dec!(42000.5), Utc::now());
        assert!(tick.is_ok());
    }

    #[test]
    fn test_zero_price_rejected() {
        let tick = PriceTick::record("BTCUSDT", Decimal::ZERO, Utc::now());
        assert_eq!(
            tick.unwrap_err(),
            TickError::NonPositivePrice(Decimal::ZERO, "BTCUSDT".into())
        );
    }

    #[test]
    fn test_negative_price_rejected() {
        let tick = PriceTick::record("ETHUSDT", dec!(-5), Utc::now());
        assert!(tick.is_err());
    }
}
