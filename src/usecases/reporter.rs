//! Profit Reporter - Realized P&L over Recorded Trades
//!
//! Read-only consumer of the trade log: filters by symbol and time range,
//! folds the fills into a realized P&L figure. No side effects on the
//! core — this backs the HTTP profit endpoint.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::profit::realized_pnl;
use crate::ports::repository::{Repository, StoreError};

/// Aggregated realized-P&L report.
#[derive(Debug, Clone, Serialize)]
pub struct ProfitReport {
  /// Realized profit (negative = loss).
  pub profit: Decimal,
  /// Number of trades included.
  pub trade_count: usize,
}

/// Aggregates completed trades into realized P&L.
pub struct ProfitReporter<R: Repository> {
  /// Trade log access.
  repository: Arc<R>,
}

impl<R: Repository> ProfitReporter<R> {
  /// Create a reporter over the shared repository.
  pub fn new(repository: Arc<R>) -> Self {
    Self { repository }
  }

  /// Realized P&L for an optional symbol and time range.
  ///
  /// Missing bounds default to the beginning of time / now.
  pub async fn realized(
    &self,
    symbol: Option<&str>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
  ) -> Result<ProfitReport, StoreError> {
    let trades = self.repository.trades_between(symbol, from, to).await?;
    Ok(ProfitReport {
      profit: realized_pnl(&trades),
      trade_count: trades.len(),
    })
  }
}
