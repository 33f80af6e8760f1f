//! Payments client for the invoicing API
//!
//! # Error Handling
//!
//! API errors are mapped to `PortError` variants:
//! - 404 -> `PortError::NotFound`
//! - 401/403 -> `PortError::Unauthorized`
//! - 429 -> `PortError::RateLimited`
//! - 5xx -> `PortError::ServiceUnavailable`
//! - Timeouts -> `PortError::Timeout`
//! - Unreadable bodies -> `PortError::Transformation`
//! - Other -> `PortError::Internal`

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::Url;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, instrument, warn};

use core_kernel::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_ledger::{ExternalPayment, PaymentSource};
use crate::circuit_breaker::CircuitBreaker;
use crate::config::InvoicingConfig;
use crate::error::InvoicingError;
use crate::models::{ManagerPayment, ManagerPaymentsResponse};

const ADAPTER_ID: &str = "invoicing-payment-source";

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "unknown error".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        })
}

/// `PaymentSource` backed by the invoicing API
///
/// Each lookup is one `GET {base_url}/payments?date=YYYY-MM-DD`. Transient
/// failures are retried with a linearly growing delay, and a circuit breaker
/// stops calling the API while it keeps failing.
///
/// # Example
///
/// ```rust,ignore
/// let source = ManagerPaymentSource::new(
///     InvoicingConfig::new("https://accounting.example.com/api").with_api_key(key),
/// )?;
/// let payments = source.fetch_external_payments_for_date(today).await?;
/// ```
#[derive(Debug)]
pub struct ManagerPaymentSource {
    config: InvoicingConfig,
    client: reqwest::Client,
    payments_url: Url,
    circuit_breaker: Option<CircuitBreaker>,
}

impl ManagerPaymentSource {
    /// Creates the adapter
    ///
    /// # Errors
    ///
    /// Returns `InvoicingError::Configuration` if the base URL or the API key
    /// cannot be used in a request
    pub fn new(config: InvoicingConfig) -> Result<Self, InvoicingError> {
        let payments_url = Url::parse(&format!("{}/payments", config.base_url.trim_end_matches('/')))
            .map_err(|e| InvoicingError::Configuration(format!("invalid base URL '{}': {e}", config.base_url)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &config.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| InvoicingError::Configuration(format!("invalid API key: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| InvoicingError::Configuration(e.to_string()))?;

        let circuit_breaker = config.circuit_breaker.clone().map(CircuitBreaker::new);

        Ok(Self {
            config,
            client,
            payments_url,
            circuit_breaker,
        })
    }

    pub fn payments_url(&self) -> &Url {
        &self.payments_url
    }

    /// Checks if the circuit breaker is open (blocking requests)
    pub async fn is_circuit_open(&self) -> bool {
        match &self.circuit_breaker {
            Some(cb) => !cb.is_available().await,
            None => false,
        }
    }

    /// Payments recorded on a date, in the API's own shape
    ///
    /// # Errors
    ///
    /// Returns `InvoicingError::CircuitOpen` without calling the API while the
    /// breaker is open, otherwise the error of the last attempt
    pub async fn fetch_payments(&self, date: NaiveDate) -> Result<Vec<ManagerPayment>, InvoicingError> {
        if self.is_circuit_open().await {
            return Err(InvoicingError::CircuitOpen);
        }

        let mut retry = 0;
        loop {
            match self.request_payments(date).await {
                Ok(payments) => {
                    if let Some(cb) = &self.circuit_breaker {
                        cb.record_success().await;
                    }
                    return Ok(payments);
                }
                Err(error) if error.is_retryable() && retry < self.config.retry_attempts => {
                    retry += 1;
                    let delay = self.config.retry_delay(retry);
                    warn!(retry, delay_ms = delay.as_millis() as u64, %error, "retrying invoicing request");
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    // Client errors mean the API is up
                    if error.is_retryable() {
                        if let Some(cb) = &self.circuit_breaker {
                            cb.record_failure().await;
                        }
                    }
                    return Err(error);
                }
            }
        }
    }

    async fn request_payments(&self, date: NaiveDate) -> Result<Vec<ManagerPayment>, InvoicingError> {
        let timeout_ms = self.config.request_timeout_ms;
        let response = self
            .client
            .get(self.payments_url.clone())
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await
            .map_err(|e| InvoicingError::from_reqwest(e, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(InvoicingError::Status {
                status: status.as_u16(),
                message: error_message(&body),
                retry_after_secs,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| InvoicingError::from_reqwest(e, timeout_ms))?;
        let parsed: ManagerPaymentsResponse =
            serde_json::from_str(&body).map_err(|e| InvoicingError::Decode(e.to_string()))?;
        Ok(parsed.payments)
    }
}

impl DomainPort for ManagerPaymentSource {}

#[async_trait]
impl HealthCheckable for ManagerPaymentSource {
    /// Fetches today's payments once, without retries
    async fn health_check(&self) -> HealthCheckResult {
        if self.is_circuit_open().await {
            return HealthCheckResult::new(
                ADAPTER_ID,
                AdapterHealth::Degraded,
                0,
                Some("Circuit breaker is open".to_string()),
            );
        }

        let start = Instant::now();
        let result = self.request_payments(Utc::now().date_naive()).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::new(ADAPTER_ID, AdapterHealth::Healthy, latency_ms, None),
            Err(e) => HealthCheckResult::new(ADAPTER_ID, AdapterHealth::Unhealthy, latency_ms, Some(e.to_string())),
        }
    }
}

#[async_trait]
impl PaymentSource for ManagerPaymentSource {
    #[instrument(skip(self))]
    async fn fetch_external_payments_for_date(&self, date: NaiveDate) -> Result<Vec<ExternalPayment>, PortError> {
        let payments = self.fetch_payments(date).await?;
        debug!(count = payments.len(), "fetched external payments");
        Ok(payments.into_iter().map(ExternalPayment::from).collect())
    }
}
