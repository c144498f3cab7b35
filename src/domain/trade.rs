//! Executed trade record.
//!
//! A `Trade` is written once, as the durable record of a confirmed fill,
//! and never mutated. The profit reporter aggregates these.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of an executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeType {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Durable record of one confirmed fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Internal trade ID.
    pub id: Uuid,
    /// Trading pair symbol.
    pub symbol: String,
    /// Execution price.
    pub price: Decimal,
    /// Executed quantity.
    pub quantity: Decimal,
    /// Fee charged by the exchange.
    pub fee: Decimal,
    /// Buy or sell.
    pub trade_type: TradeType,
    /// Execution timestamp.
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// Record a fill that just executed.
    pub fn executed(
        symbol: impl Into<String>,
        trade_type: TradeType,
        price: Decimal,
        quantity: Decimal,
        fee: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            price,
            quantity,
            fee,
            trade_type,
            executed_at: Utc::now(),
        }
    }
}
