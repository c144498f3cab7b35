//! Binance Gateway — Adapter for the ExchangeGateway Port
//!
//! Implements the `ExchangeGateway` port using the shared `RestClient`
//! for authenticated requests. Stop orders are placed as STOP_LOSS_LIMIT
//! (GTC) with the limit price trailing slightly below the stop trigger;
//! liquidation uses a plain MARKET sell.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::client::RestClient;
use crate::ports::exchange::{ExchangeGateway, GatewayError, MarketSellFill};

/// Ticker price payload: `{"symbol": "BTCUSDT", "price": "42000.10"}`.
#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: Decimal,
}

/// One balance entry from the account endpoint.
#[derive(Debug, Deserialize)]
struct Balance {
    asset: String,
    free: Decimal,
}

/// Account information payload (balances only — the rest is ignored).
#[derive(Debug, Deserialize)]
struct AccountInfo {
    balances: Vec<Balance>,
}

/// Response to a new-order request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewOrderResponse {
    order_id: i64,
    #[serde(default)]
    status: String,
    #[serde(default)]
    executed_qty: Option<Decimal>,
    #[serde(default)]
    cummulative_quote_qty: Option<Decimal>,
    #[serde(default)]
    fills: Vec<OrderFill>,
}

/// Partial fill detail within a market order response.
#[derive(Debug, Deserialize)]
struct OrderFill {
    price: Decimal,
    qty: Decimal,
    commission: Decimal,
}

/// Response to an order cancellation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelResponse {
    #[serde(default)]
    status: String,
}

/// Binance spot gateway backed by the shared signed REST client.
pub struct BinanceGateway {
    /// Shared client with auth + retry.
    client: Arc<RestClient>,
}

impl BinanceGateway {
    /// Create a new gateway.
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }

    /// Average fill price of a market order response.
    fn fill_price(response: &NewOrderResponse) -> Option<Decimal> {
        let executed = response.executed_qty?;
        if executed <= Decimal::ZERO {
            return None;
        }
        if let Some(quote) = response.cummulative_quote_qty {
            return Some(quote / executed);
        }
        let notional: Decimal = response.fills.iter().map(|f| f.price * f.qty).sum();
        Some(notional / executed)
    }
}

#[async_trait]
impl ExchangeGateway for BinanceGateway {
    #[instrument(skip(self))]
    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, GatewayError> {
        let ticker: TickerPrice = self
            .client
            .get_public("/api/v3/ticker/price", &format!("symbol={symbol}"))
            .await?;

        if ticker.price <= Decimal::ZERO {
            return Err(GatewayError::InvalidResponse(format!(
                "non-positive ticker price {} for {symbol}",
                ticker.price
            )));
        }
        Ok(ticker.price)
    }

    #[instrument(skip(self))]
    async fn get_held_quantity(&self, asset: &str) -> Result<Decimal, GatewayError> {
        let account: AccountInfo = self.client.get_signed("/api/v3/account", "").await?;

        Ok(account
            .balances
            .into_iter()
            .find(|b| b.asset == asset)
            .map_or(Decimal::ZERO, |b| b.free))
    }

    #[instrument(skip(self))]
    async fn cancel_order(
        &self,
        symbol: &str,
        exchange_order_id: &str,
    ) -> Result<(), GatewayError> {
        let response: CancelResponse = self
            .client
            .delete_signed(
                "/api/v3/order",
                &format!("symbol={symbol}&orderId={exchange_order_id}"),
            )
            .await?;

        if response.status == "CANCELED" || response.status.is_empty() {
            info!(symbol, exchange_order_id, "Exchange order cancelled");
            Ok(())
        } else {
            Err(GatewayError::Rejected(format!(
                "cancel returned status {}",
                response.status
            )))
        }
    }

    #[instrument(skip(self))]
    async fn place_stop_order(
        &self,
        symbol: &str,
        quantity: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
    ) -> Result<String, GatewayError> {
        let query = format!(
            "symbol={symbol}&side=SELL&type=STOP_LOSS_LIMIT&timeInForce=GTC\
             &quantity={quantity}&price={limit_price}&stopPrice={stop_price}"
        );
        let response: NewOrderResponse =
            self.client.post_signed("/api/v3/order", &query).await?;

        info!(
            symbol,
            order_id = response.order_id,
            %stop_price,
            "Stop order placed"
        );
        Ok(response.order_id.to_string())
    }

    #[instrument(skip(self))]
    async fn place_market_sell(
        &self,
        symbol: &str,
        quantity: Decimal,
    ) -> Result<MarketSellFill, GatewayError> {
        let query = format!("symbol={symbol}&side=SELL&type=MARKET&quantity={quantity}");
        let response: NewOrderResponse =
            self.client.post_signed("/api/v3/order", &query).await?;

        if response.status != "FILLED" {
            warn!(symbol, status = %response.status, "Market sell not filled");
            return Err(GatewayError::Rejected(format!(
                "market sell returned status {}",
                response.status
            )));
        }

        let executed_qty = response
            .executed_qty
            .filter(|q| *q > Decimal::ZERO)
            .ok_or_else(|| {
                GatewayError::InvalidResponse("market sell reported no executed quantity".into())
            })?;
        let executed_price = Self::fill_price(&response).ok_or_else(|| {
            GatewayError::InvalidResponse("market sell reported no fill price".into())
        })?;
        let fee = response.fills.iter().map(|f| f.commission).sum();

        info!(symbol, %executed_qty, %executed_price, "Market sell filled");
        Ok(MarketSellFill {
            executed_qty,
            executed_price,
            fee,
        })
    }

    async fn is_healthy(&self) -> bool {
        self.client
            .get_public::<serde_json::Value>("/api/v3/ping", "")
            .await
            .is_ok()
    }
}
