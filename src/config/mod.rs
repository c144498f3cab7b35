//! Configuration Module - TOML-based Bot Configuration
//!
//! Loads and validates configuration from `config.toml`. All exchange
//! endpoints, trailing factors, and timing parameters are externalized
//! here - nothing is hardcoded in the domain layer. API credentials come
//! from the environment, never from the config file.

pub mod loader;

use serde::Deserialize;

use crate::domain::trailing::TrailingPolicy;

/// Top-level bot configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the bot begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Bot identity and metadata.
  pub bot: BotConfig,
  /// Symbols to track and protect.
  pub symbols: Vec<SymbolConfig>,
  /// Exchange REST/WebSocket endpoints and client tuning.
  pub exchange: ExchangeConfig,
  /// Price feed reconnect behavior.
  pub feed: FeedConfig,
  /// Trailing-stop decision factors.
  #[serde(default)]
  pub trailing: TrailingPolicy,
  /// Order controller scheduling.
  pub controller: ControllerConfig,
  /// HTTP server for health/profit/metrics endpoints.
  #[serde(default)]
  pub server: ServerConfig,
  /// Persistence configuration.
  #[serde(default)]
  pub persistence: PersistenceConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
  /// Human-readable bot name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// One tracked trading pair.
///
/// Base and quote assets are explicit — the held asset is never inferred
/// by slicing a suffix off the pair symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolConfig {
  /// Exchange pair symbol (e.g., "BTCUSDT").
  pub symbol: String,
  /// Asset actually held and protected (e.g., "BTC").
  pub base_asset: String,
  /// Quote currency of the pair (e.g., "USDT").
  pub quote_asset: String,
  /// Whether this symbol is actively managed.
  #[serde(default = "default_true")]
  pub active: bool,
}

/// Exchange endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
  /// REST API base URL.
  pub rest_url: String,
  /// WebSocket URL template; `{symbol}` is replaced per feed
  /// (e.g., "wss://stream.binance.com:9443/ws/{symbol}@trade").
  pub ws_url_template: String,
  /// REST request timeout in milliseconds.
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Maximum REST retries on transient errors.
  #[serde(default = "default_rest_retries")]
  pub max_retries: u32,
  /// Base delay between REST retries (milliseconds, exponential).
  #[serde(default = "default_retry_base_delay_ms")]
  pub retry_base_delay_ms: u64,
}

/// Price feed reconnect configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
  /// Reconnect attempts before the feed gives up for good.
  #[serde(default = "default_feed_retries")]
  pub max_retries: u32,
  /// First reconnect delay (milliseconds).
  #[serde(default = "default_base_reconnect_ms")]
  pub base_reconnect_delay_ms: u64,
  /// Multiplier applied to the delay after every failed attempt.
  #[serde(default = "default_backoff_factor")]
  pub backoff_factor: f64,
  /// Ceiling for the reconnect delay (milliseconds).
  #[serde(default = "default_max_reconnect_ms")]
  pub max_reconnect_delay_ms: u64,
}

/// Order controller scheduling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
  /// Seconds between run-cycles per symbol.
  #[serde(default = "default_cycle_secs")]
  pub cycle_interval_secs: u64,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Bind address for the read-only HTTP surface.
  #[serde(default = "default_bind_address")]
  pub bind_address: String,
  /// Port for health/profit/metrics endpoints.
  #[serde(default = "default_server_port")]
  pub port: u16,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind_address: default_bind_address(),
      port: default_server_port(),
    }
  }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for tick/trade logs and order state.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_timeout_ms() -> u64 {
  10_000
}

fn default_rest_retries() -> u32 {
  3
}

fn default_retry_base_delay_ms() -> u64 {
  200
}

fn default_feed_retries() -> u32 {
  10
}

fn default_base_reconnect_ms() -> u64 {
  1_000
}

fn default_backoff_factor() -> f64 {
  1.5
}

fn default_max_reconnect_ms() -> u64 {
  300_000
}

fn default_cycle_secs() -> u64 {
  15
}

fn default_bind_address() -> String {
  "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
  8080
}

fn default_data_dir() -> String {
  "data".to_string()
}
