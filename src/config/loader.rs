//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config: AppConfig =
    toml::from_str(&content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;

  info!(
    symbols = config.symbols.len(),
    cycle_secs = config.controller.cycle_interval_secs,
    adjustment_threshold = %config.trailing.adjustment_threshold,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Non-empty symbol definitions with explicit base/quote assets
/// - Trailing factors on the right side of 1.0
/// - Feed backoff parameters that actually back off
/// - A WebSocket template that can address a symbol
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.symbols.is_empty(),
    "At least one symbol must be configured"
  );

  for (i, entry) in config.symbols.iter().enumerate() {
    anyhow::ensure!(
      !entry.symbol.is_empty(),
      "Symbol {} has an empty pair symbol",
      i
    );
    anyhow::ensure!(
      !entry.base_asset.is_empty(),
      "Symbol {} ({}) has empty base_asset",
      i,
      entry.symbol
    );
    anyhow::ensure!(
      !entry.quote_asset.is_empty(),
      "Symbol {} ({}) has empty quote_asset",
      i,
      entry.symbol
    );
  }

  let trailing = &config.trailing;
  anyhow::ensure!(
    trailing.adjustment_threshold > Decimal::ONE,
    "adjustment_threshold must exceed 1.0, got {}",
    trailing.adjustment_threshold
  );
  anyhow::ensure!(
    trailing.stop_trail_factor > Decimal::ONE,
    "stop_trail_factor must exceed 1.0, got {}",
    trailing.stop_trail_factor
  );
  anyhow::ensure!(
    trailing.limit_offset_factor > Decimal::ZERO
      && trailing.limit_offset_factor < Decimal::ONE,
    "limit_offset_factor must be in (0, 1), got {}",
    trailing.limit_offset_factor
  );
  anyhow::ensure!(
    trailing.retracement_factor > Decimal::ZERO
      && trailing.retracement_factor < Decimal::ONE,
    "retracement_factor must be in (0, 1), got {}",
    trailing.retracement_factor
  );
  // The two bands must not overlap or every adjustment would
  // immediately re-trigger.
  anyhow::ensure!(
    trailing.retracement_factor < trailing.adjustment_threshold,
    "retracement_factor must stay below adjustment_threshold"
  );

  anyhow::ensure!(
    config.exchange.ws_url_template.contains("{symbol}"),
    "ws_url_template must contain a {{symbol}} placeholder"
  );
  anyhow::ensure!(
    !config.exchange.rest_url.is_empty(),
    "Exchange REST URL must not be empty"
  );

  anyhow::ensure!(
    config.feed.backoff_factor > 1.0,
    "feed backoff_factor must exceed 1.0, got {}",
    config.feed.backoff_factor
  );
  anyhow::ensure!(
    config.feed.base_reconnect_delay_ms > 0,
    "feed base_reconnect_delay_ms must be positive"
  );
  anyhow::ensure!(
    config.feed.max_reconnect_delay_ms >= config.feed.base_reconnect_delay_ms,
    "feed max_reconnect_delay_ms must be >= base_reconnect_delay_ms"
  );

  anyhow::ensure!(
    config.controller.cycle_interval_secs > 0,
    "controller cycle_interval_secs must be positive"
  );

  Ok(())
}
