//! Realized profit-and-loss aggregation.
//!
//! Folds a sequence of executed trades into a single realized P&L figure:
//! sells add `price × quantity − fee`, buys subtract `price × quantity + fee`.

use rust_decimal::Decimal;

use super::trade::{Trade, TradeType};

/// Realized P&L over a set of trades.
pub fn realized_pnl<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Decimal {
    trades.into_iter().fold(Decimal::ZERO, |acc, trade| {
        let gross = trade.price * trade.quantity;
        match trade.trade_type {
            TradeType::Buy => acc - gross - trade.fee,
            TradeType::Sell => acc + gross - trade.fee,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade(trade_type: TradeType, price: Decimal, qty: Decimal, fee: Decimal) -> Trade {
        Trade::executed("BTCUSDT", trade_type, price, qty, fee)
    }

    #[test]
    fn test_round_trip_profit() {
        let trades = vec![
            trade(TradeType::Buy, dec!(100), dec!(1), dec!(1)),
            trade(TradeType::Sell, dec!(110), dec!(1), dec!(1)),
        ];
        assert_eq!(realized_pnl(&trades), dec!(8));
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(realized_pnl(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_fees_always_reduce_pnl() {
        let with_fees = vec![trade(TradeType::Sell, dec!(50), dec!(2), dec!(0.5))];
        let without = vec![trade(TradeType::Sell, dec!(50), dec!(2), Decimal::ZERO)];
        assert!(realized_pnl(&with_fees) < realized_pnl(&without));
    }
}
