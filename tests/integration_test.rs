//! Integration Tests - Controller Against Mock Ports
//!
//! Tests the run-cycle state machine against mocked exchange and store
//! ports. Uses mockall for trait mocking and tokio::test for async tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use mockall::mock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use trailstop::adapters::metrics::BotMetrics;
use trailstop::config::{
    AppConfig, BotConfig, ControllerConfig, ExchangeConfig, FeedConfig, PersistenceConfig,
    ServerConfig, SymbolConfig,
};
use trailstop::domain::order::{Order, OrderStatus};
use trailstop::domain::tick::PriceTick;
use trailstop::domain::trade::{Trade, TradeType};
use trailstop::domain::trailing::TrailingPolicy;
use trailstop::ports::exchange::{ExchangeGateway, GatewayError, MarketSellFill};
use trailstop::ports::repository::{Repository, StoreError};
use trailstop::usecases::controller::{CycleError, CycleOutcome, OrderController};
use trailstop::usecases::reporter::ProfitReporter;

// ---- Mock Definitions ----

mock! {
    pub Gateway {}

    #[async_trait::async_trait]
    impl ExchangeGateway for Gateway {
        async fn get_current_price(&self, symbol: &str) -> Result<Decimal, GatewayError>;

        async fn get_held_quantity(&self, asset: &str) -> Result<Decimal, GatewayError>;

        async fn cancel_order(
            &self,
            symbol: &str,
            exchange_order_id: &str,
        ) -> Result<(), GatewayError>;

        async fn place_stop_order(
            &self,
            symbol: &str,
            quantity: Decimal,
            stop_price: Decimal,
            limit_price: Decimal,
        ) -> Result<String, GatewayError>;

        async fn place_market_sell(
            &self,
            symbol: &str,
            quantity: Decimal,
        ) -> Result<MarketSellFill, GatewayError>;

        async fn is_healthy(&self) -> bool;
    }
}

mock! {
    pub Repo {}

    #[async_trait::async_trait]
    impl Repository for Repo {
        async fn insert_tick(&self, tick: &PriceTick) -> Result<(), StoreError>;

        async fn latest_tick(&self, symbol: &str) -> Result<Option<PriceTick>, StoreError>;

        async fn find_open_order(&self, symbol: &str) -> Result<Option<Order>, StoreError>;

        async fn create_order(&self, order: &Order) -> Result<Order, StoreError>;

        async fn update_order(
            &self,
            order: &Order,
            expected_version: u64,
        ) -> Result<Order, StoreError>;

        async fn insert_trade(&self, trade: &Trade) -> Result<(), StoreError>;

        #[mockall::concretize]
        async fn trades_between(
            &self,
            symbol: Option<&str>,
            from: Option<chrono::DateTime<Utc>>,
            to: Option<chrono::DateTime<Utc>>,
        ) -> Result<Vec<Trade>, StoreError>;

        async fn recent_trades(&self, symbol: &str, limit: usize) -> Result<Vec<Trade>, StoreError>;

        async fn is_healthy(&self) -> bool;
    }
}

// ---- Helpers ----

fn test_config() -> AppConfig {
    AppConfig {
        bot: BotConfig {
            name: "trailstop-test".to_string(),
            log_level: "warn".to_string(),
        },
        symbols: vec![SymbolConfig {
            symbol: "BTCUSDT".to_string(),
            base_asset: "BTC".to_string(),
            quote_asset: "USDT".to_string(),
            active: true,
        }],
        exchange: ExchangeConfig {
            rest_url: "https://api.binance.test".to_string(),
            ws_url_template: "wss://stream.binance.test/ws/{symbol}@trade".to_string(),
            timeout_ms: 1_000,
            max_retries: 0,
            retry_base_delay_ms: 1,
        },
        feed: FeedConfig {
            max_retries: 3,
            base_reconnect_delay_ms: 10,
            backoff_factor: 1.5,
            max_reconnect_delay_ms: 100,
        },
        trailing: TrailingPolicy::default(),
        controller: ControllerConfig {
            cycle_interval_secs: 1,
        },
        server: ServerConfig::default(),
        persistence: PersistenceConfig::default(),
    }
}

fn controller(
    gateway: MockGateway,
    repo: MockRepo,
) -> OrderController<MockGateway, MockRepo> {
    OrderController::new(
        &test_config(),
        Arc::new(gateway),
        Arc::new(repo),
        Arc::new(BotMetrics::new().unwrap()),
    )
}

fn open_order(stop: Decimal, watermark: Decimal, exchange_order_id: Option<&str>) -> Order {
    let mut order = Order::open("BTCUSDT", stop, dec!(0.5));
    order.highest_observed_price = watermark;
    order.exchange_order_id = exchange_order_id.map(String::from);
    order
}

fn tick(price: Decimal) -> PriceTick {
    PriceTick::record("BTCUSDT", price, Utc::now()).unwrap()
}

// ---- Initialization ----

#[tokio::test]
async fn initialization_creates_exactly_one_open_order() {
    let mut gateway = MockGateway::new();
    let mut repo = MockRepo::new();

    repo.expect_find_open_order()
        .returning(|_| Ok(None))
        .times(1);
    gateway
        .expect_get_current_price()
        .returning(|_| Ok(dec!(42000)))
        .times(1);
    gateway
        .expect_get_held_quantity()
        .withf(|asset| asset == "BTC")
        .returning(|_| Ok(dec!(0.5)))
        .times(1);
    repo.expect_create_order()
        .withf(|order| {
            order.status == OrderStatus::Open
                && order.stop_price == dec!(42000)
                && order.highest_observed_price == dec!(42000)
                && order.quantity == dec!(0.5)
        })
        .returning(|order| Ok(order.clone()))
        .times(1);
    // No cancel/place/sell expectations: the creation cycle must not
    // run any adjustment or liquidation logic.

    let outcome = controller(gateway, repo).run_cycle("BTCUSDT").await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Initialized { .. }));
}

#[tokio::test]
async fn initialization_aborts_on_non_positive_quantity() {
    let mut gateway = MockGateway::new();
    let mut repo = MockRepo::new();

    repo.expect_find_open_order().returning(|_| Ok(None));
    gateway
        .expect_get_current_price()
        .returning(|_| Ok(dec!(42000)));
    gateway
        .expect_get_held_quantity()
        .returning(|_| Ok(Decimal::ZERO));
    // create_order must never be called.

    let result = controller(gateway, repo).run_cycle("BTCUSDT").await;
    assert!(matches!(result, Err(CycleError::Validation(_))));
}

// ---- Missing data ----

#[tokio::test]
async fn missing_tick_is_a_recoverable_noop() {
    let gateway = MockGateway::new();
    let mut repo = MockRepo::new();

    repo.expect_find_open_order()
        .returning(|_| Ok(Some(open_order(dec!(100), dec!(100), None))));
    repo.expect_latest_tick().returning(|_| Ok(None));

    let outcome = controller(gateway, repo).run_cycle("BTCUSDT").await.unwrap();
    assert_eq!(outcome, CycleOutcome::NoData);
}

// ---- Watermark + adjustment ----

#[tokio::test]
async fn adjustment_persists_watermark_before_new_stop() {
    let mut gateway = MockGateway::new();
    let mut repo = MockRepo::new();
    let mut seq = mockall::Sequence::new();

    repo.expect_find_open_order()
        .returning(|_| Ok(Some(open_order(dec!(100), dec!(100), Some("ex-1")))));
    repo.expect_latest_tick()
        .returning(|_| Ok(Some(tick(dec!(101)))));

    // The raised watermark is written durably first, stop untouched.
    repo.expect_update_order()
        .withf(|order, _| {
            order.highest_observed_price == dec!(101) && order.stop_price == dec!(100)
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|order, expected| {
            let mut stored = order.clone();
            stored.version = expected + 1;
            Ok(stored)
        });

    gateway
        .expect_cancel_order()
        .withf(|_, id| id == "ex-1")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    gateway
        .expect_place_stop_order()
        .withf(|_, qty, stop, limit| {
            *qty == dec!(0.5) && *stop == dec!(102.01) && *limit == dec!(102.01) * dec!(0.99)
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _, _| Ok("ex-2".to_string()));

    // Only then is the adjusted stop persisted.
    repo.expect_update_order()
        .withf(|order, _| {
            order.stop_price == dec!(102.01)
                && order.exchange_order_id.as_deref() == Some("ex-2")
                && order.status == OrderStatus::Open
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|order, expected| {
            let mut stored = order.clone();
            stored.version = expected + 1;
            Ok(stored)
        });

    let outcome = controller(gateway, repo).run_cycle("BTCUSDT").await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Adjusted {
            new_stop: dec!(102.01)
        }
    );
}

#[tokio::test]
async fn failed_adjustment_leaves_previous_stop_authoritative() {
    let mut gateway = MockGateway::new();
    let mut repo = MockRepo::new();

    repo.expect_find_open_order()
        .returning(|_| Ok(Some(open_order(dec!(100), dec!(101), Some("ex-1")))));
    repo.expect_latest_tick()
        .returning(|_| Ok(Some(tick(dec!(101)))));

    gateway.expect_cancel_order().returning(|_, _| Ok(()));
    gateway
        .expect_place_stop_order()
        .returning(|_, _, _, _| Err(GatewayError::Transient("timeout".to_string())));
    // update_order must never run: no partial state is persisted.

    let result = controller(gateway, repo).run_cycle("BTCUSDT").await;
    assert!(matches!(result, Err(CycleError::Gateway(_))));
}

#[tokio::test]
async fn first_adjustment_skips_cancel_without_exchange_order() {
    let mut gateway = MockGateway::new();
    let mut repo = MockRepo::new();

    repo.expect_find_open_order()
        .returning(|_| Ok(Some(open_order(dec!(100), dec!(101), None))));
    repo.expect_latest_tick()
        .returning(|_| Ok(Some(tick(dec!(101)))));
    // No cancel expectation: nothing to cancel before the first placement.
    gateway
        .expect_place_stop_order()
        .times(1)
        .returning(|_, _, _, _| Ok("ex-1".to_string()));
    repo.expect_update_order()
        .returning(|order, expected| {
            let mut stored = order.clone();
            stored.version = expected + 1;
            Ok(stored)
        });

    let outcome = controller(gateway, repo).run_cycle("BTCUSDT").await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Adjusted { .. }));
}

// ---- Liquidation ----

#[tokio::test]
async fn retracement_liquidates_and_records_the_fill() {
    let mut gateway = MockGateway::new();
    let mut repo = MockRepo::new();

    repo.expect_find_open_order()
        .returning(|_| Ok(Some(open_order(dec!(100), dec!(110), Some("ex-1")))));
    repo.expect_latest_tick()
        .returning(|_| Ok(Some(tick(dec!(98.9)))));

    gateway
        .expect_get_held_quantity()
        .withf(|asset| asset == "BTC")
        .returning(|_| Ok(dec!(0.5)));
    gateway
        .expect_place_market_sell()
        .withf(|symbol, qty| symbol == "BTCUSDT" && *qty == dec!(0.5))
        .times(1)
        .returning(|_, _| {
            Ok(MarketSellFill {
                executed_qty: dec!(0.5),
                executed_price: dec!(98.7),
                fee: dec!(0.05),
            })
        });

    repo.expect_insert_trade()
        .withf(|trade| {
            trade.trade_type == TradeType::Sell
                && trade.quantity == dec!(0.5)
                && trade.price == dec!(98.7)
                && trade.fee == dec!(0.05)
        })
        .times(1)
        .returning(|_| Ok(()));
    repo.expect_update_order()
        .withf(|order, _| order.status == OrderStatus::Filled)
        .times(1)
        .returning(|order, expected| {
            let mut stored = order.clone();
            stored.version = expected + 1;
            Ok(stored)
        });

    let outcome = controller(gateway, repo).run_cycle("BTCUSDT").await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Liquidated {
            executed_qty: dec!(0.5),
            executed_price: dec!(98.7),
        }
    );
}

#[tokio::test]
async fn liquidation_refuses_non_positive_quantity() {
    let mut gateway = MockGateway::new();
    let mut repo = MockRepo::new();

    repo.expect_find_open_order()
        .returning(|_| Ok(Some(open_order(dec!(100), dec!(110), Some("ex-1")))));
    repo.expect_latest_tick()
        .returning(|_| Ok(Some(tick(dec!(98.9)))));
    gateway
        .expect_get_held_quantity()
        .returning(|_| Ok(Decimal::ZERO));
    // place_market_sell must never be called with a zero quantity.

    let result = controller(gateway, repo).run_cycle("BTCUSDT").await;
    assert!(matches!(result, Err(CycleError::Validation(_))));
}

#[tokio::test]
async fn small_retracement_holds() {
    let gateway = MockGateway::new();
    let mut repo = MockRepo::new();

    repo.expect_find_open_order()
        .returning(|_| Ok(Some(open_order(dec!(100), dec!(100), Some("ex-1")))));
    repo.expect_latest_tick()
        .returning(|_| Ok(Some(tick(dec!(99.1)))));
    // 99.1 is neither below 99 nor above 100.5: no exchange calls at all.

    let outcome = controller(gateway, repo).run_cycle("BTCUSDT").await.unwrap();
    assert_eq!(outcome, CycleOutcome::Held);
}

// ---- Re-entrancy guard ----

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overlapping_cycles_issue_one_set_of_exchange_calls() {
    let mut gateway = MockGateway::new();
    let mut repo = MockRepo::new();

    // The first cycle parks inside its store read until the test
    // releases this lock, keeping the per-symbol guard held.
    let gate = Arc::new(Mutex::new(()));
    let held = gate.lock().unwrap();

    let gate_in_mock = Arc::clone(&gate);
    repo.expect_find_open_order()
        .times(1)
        .returning(move |_| {
            let _released = gate_in_mock.lock().unwrap();
            Ok(None)
        });
    gateway
        .expect_get_current_price()
        .times(1)
        .returning(|_| Ok(dec!(42000)));
    gateway
        .expect_get_held_quantity()
        .times(1)
        .returning(|_| Ok(dec!(0.5)));
    repo.expect_create_order()
        .times(1)
        .returning(|order| Ok(order.clone()));

    let controller = Arc::new(controller(gateway, repo));

    let first = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.run_cycle("BTCUSDT").await }
    });

    // Give the first cycle time to take the guard and park.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = controller.run_cycle("BTCUSDT").await.unwrap();
    assert_eq!(second, CycleOutcome::Skipped);

    drop(held);
    let first = first.await.unwrap().unwrap();
    assert!(matches!(first, CycleOutcome::Initialized { .. }));
}

// ---- Profit reporter ----

#[tokio::test]
async fn profit_report_matches_recorded_trades() {
    let mut repo = MockRepo::new();
    repo.expect_trades_between().returning(|_, _, _| {
        Ok(vec![
            Trade::executed("BTCUSDT", TradeType::Buy, dec!(100), dec!(1), dec!(1)),
            Trade::executed("BTCUSDT", TradeType::Sell, dec!(110), dec!(1), dec!(1)),
        ])
    });

    let reporter = ProfitReporter::new(Arc::new(repo));
    let report = reporter.realized(Some("BTCUSDT"), None, None).await.unwrap();
    assert_eq!(report.profit, dec!(8));
    assert_eq!(report.trade_count, 2);
}

// ---- Unknown symbol ----

#[tokio::test]
async fn unconfigured_symbol_is_rejected() {
    let result = controller(MockGateway::new(), MockRepo::new())
        .run_cycle("DOGEUSDT")
        .await;
    assert!(matches!(result, Err(CycleError::UnknownSymbol(_))));
}
