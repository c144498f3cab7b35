//! Exchange HTTP Client - Retrying REST Client with Typed Failures
//!
//! Wraps reqwest for all Binance REST interactions. Transient conditions
//! (timeouts, 429, 5xx) are retried with exponential backoff before being
//! surfaced as `GatewayError::Transient`; client-side errors map to
//! `Rejected` or `Fatal` so callers can tell what is worth retrying on
//! the next cycle.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::auth::ExchangeAuth;
use crate::ports::exchange::GatewayError;

/// Configuration for the exchange HTTP client.
#[derive(Debug, Clone)]
pub struct RestClientConfig {
  /// Base URL for the REST API.
  pub base_url: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl Default for RestClientConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.binance.com".to_string(),
      timeout: Duration::from_secs(10),
      max_retries: 3,
      retry_base_delay: Duration::from_millis(200),
    }
  }
}

/// Retrying HTTP client for the exchange REST API.
pub struct RestClient {
  /// Underlying HTTP client.
  http: Client,
  /// Request signer.
  auth: Arc<ExchangeAuth>,
  /// Client configuration.
  config: RestClientConfig,
}

impl RestClient {
  /// Create a new REST client.
  pub fn new(auth: Arc<ExchangeAuth>, config: RestClientConfig) -> Result<Self, GatewayError> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .build()
      .map_err(|e| GatewayError::Fatal(format!("failed to build HTTP client: {e}")))?;

    Ok(Self { http, auth, config })
  }

  /// Public (unsigned) GET, deserialized as JSON.
  pub async fn get_public<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &str,
  ) -> Result<T, GatewayError> {
    let url = self.url(path, query);
    let response = self
      .execute_with_retry(|| self.http.get(&url))
      .await?;
    Self::decode(response).await
  }

  /// Signed GET (account endpoints).
  pub async fn get_signed<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &str,
  ) -> Result<T, GatewayError> {
    self.send_signed(Method::GET, path, query).await
  }

  /// Signed POST (order placement).
  pub async fn post_signed<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &str,
  ) -> Result<T, GatewayError> {
    self.send_signed(Method::POST, path, query).await
  }

  /// Signed DELETE (order cancellation).
  pub async fn delete_signed<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &str,
  ) -> Result<T, GatewayError> {
    self.send_signed(Method::DELETE, path, query).await
  }

  async fn send_signed<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    query: &str,
  ) -> Result<T, GatewayError> {
    // Signature covers the timestamp, so it is rebuilt per attempt.
    let response = self
      .execute_with_retry(|| {
        let url = self.url(path, &self.auth.signed_query(query));
        self
          .http
          .request(method.clone(), url)
          .header("X-MBX-APIKEY", self.auth.api_key())
      })
      .await?;
    Self::decode(response).await
  }

  fn url(&self, path: &str, query: &str) -> String {
    if query.is_empty() {
      format!("{}{}", self.config.base_url, path)
    } else {
      format!("{}{}?{}", self.config.base_url, path, query)
    }
  }

  async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    response
      .json::<T>()
      .await
      .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
  }

  /// Execute a request with retries on transient failures.
  async fn execute_with_retry(
    &self,
    build: impl Fn() -> reqwest::RequestBuilder,
  ) -> Result<Response, GatewayError> {
    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = self.config.retry_base_delay * 2u32.pow(attempt - 1);
        debug!(attempt, delay_ms = delay.as_millis(), "Retrying request");
        sleep(delay).await;
      }

      match build().send().await {
        Ok(response) => match response.status() {
          StatusCode::OK | StatusCode::CREATED => return Ok(response),
          StatusCode::TOO_MANY_REQUESTS => {
            warn!("Rate limited by exchange, backing off");
            last_error = Some(GatewayError::Transient("rate limited".to_string()));
            continue;
          }
          status if status.is_server_error() => {
            warn!(status = %status, "Server error, retrying");
            last_error = Some(GatewayError::Transient(format!("server error: {status}")));
            continue;
          }
          StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Fatal(format!("auth failure: {body}")));
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected(format!("{status}: {body}")));
          }
        },
        Err(e) => {
          warn!(error = %e, attempt, "Request failed");
          last_error = Some(GatewayError::Transient(e.to_string()));
          continue;
        }
      }
    }

    Err(
      last_error
        .unwrap_or_else(|| GatewayError::Transient("max retries exceeded".to_string())),
    )
  }
}
