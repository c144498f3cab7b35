//! Exchange Authentication — HMAC-SHA256 Query Signing
//!
//! Signs private Binance REST requests per the spot API specification:
//! the full query string (timestamp included) is HMAC-SHA256'd with the
//! API secret and appended as `signature=<hex>`. Credentials come from
//! environment variables (EXCHANGE_API_KEY, EXCHANGE_API_SECRET).

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

/// Exchange API authentication handler.
///
/// Holds the API key and secret loaded from env vars. The secret is never
/// sent over the wire — only the computed signature.
pub struct ExchangeAuth {
    /// API key from EXCHANGE_API_KEY env var (sent as X-MBX-APIKEY).
    api_key: String,
    /// API secret from EXCHANGE_API_SECRET env var.
    api_secret: String,
}

impl ExchangeAuth {
    /// Load credentials from environment variables.
    ///
    /// Required env vars: EXCHANGE_API_KEY, EXCHANGE_API_SECRET.
    /// These MUST be set in the environment (never committed to git).
    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var("EXCHANGE_API_KEY").context("EXCHANGE_API_KEY not set")?;
        let api_secret =
            std::env::var("EXCHANGE_API_SECRET").context("EXCHANGE_API_SECRET not set")?;

        Ok(Self {
            api_key,
            api_secret,
        })
    }

    /// Build an auth handler from explicit credentials (tests).
    #[cfg(test)]
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Get the API key for the request header.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Current Unix timestamp in milliseconds, as the API expects it.
    pub fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// Sign a query string: HMAC-SHA256(secret, query) hex-encoded.
    pub fn sign(&self, query: &str) -> String {
        let mac = hmac_sha256::HMAC::mac(query.as_bytes(), self.api_secret.as_bytes());
        let mut hex = String::with_capacity(mac.len() * 2);
        for byte in mac {
            hex.push_str(&format!("{byte:02x}"));
        }
        hex
    }

    /// Append timestamp and signature to a query string.
    pub fn signed_query(&self, query: &str) -> String {
        let with_ts = if query.is_empty() {
            format!("timestamp={}", Self::timestamp_ms())
        } else {
            format!("{query}&timestamp={}", Self::timestamp_ms())
        };
        let signature = self.sign(&with_ts);
        format!("{with_ts}&signature={signature}")
    }
}
