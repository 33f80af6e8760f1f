//! Invoicing adapter configuration

use serde::Deserialize;
use std::time::Duration;

use core_kernel::CircuitBreakerConfig;
use crate::error::InvoicingError;

/// Connection settings for the invoicing API
///
/// Loaded from environment variables prefixed with `INVOICING_`, with nested
/// keys separated by `__`:
///
/// ```text
/// INVOICING_BASE_URL=https://accounting.example.com/api
/// INVOICING_API_KEY=...
/// INVOICING_REQUEST_TIMEOUT_MS=10000
/// INVOICING_CIRCUIT_BREAKER__FAILURE_THRESHOLD=5
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvoicingConfig {
    /// Base URL of the API; `/payments` is appended
    pub base_url: String,
    /// Bearer token sent with every request
    pub api_key: Option<String>,
    /// Timeout of a single HTTP request
    pub request_timeout_ms: u64,
    /// Retries after the first attempt, for transient failures only
    pub retry_attempts: u32,
    /// Base delay; the n-th retry waits `n * retry_delay_ms`
    pub retry_delay_ms: u64,
    /// Disabled when `None`
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            request_timeout_ms: 10_000,
            retry_attempts: 3,
            retry_delay_ms: 1_000,
            circuit_breaker: Some(CircuitBreakerConfig::default()),
        }
    }
}

impl InvoicingConfig {
    /// Creates a configuration with default limits
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Loads the configuration from the environment
    ///
    /// A `.env` file is read first when present.
    ///
    /// # Errors
    ///
    /// Returns `InvoicingError::Configuration` if a variable cannot be parsed
    /// or no base URL is set
    pub fn from_env() -> Result<Self, InvoicingError> {
        let _ = dotenvy::dotenv();

        let config: Self = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("INVOICING")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| InvoicingError::Configuration(e.to_string()))?;

        if config.base_url.trim().is_empty() {
            return Err(InvoicingError::Configuration("INVOICING_BASE_URL is not set".to_string()));
        }
        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Sets the retry count and the base delay between attempts
    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = Some(config);
        self
    }

    pub fn without_circuit_breaker(mut self) -> Self {
        self.circuit_breaker = None;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Delay before the given retry (1-based)
    pub fn retry_delay(&self, retry: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(u64::from(retry)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InvoicingConfig::new("https://accounting.example.com");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.retry_attempts, 3);
        assert!(config.api_key.is_none());
        assert!(config.circuit_breaker.is_some());
    }

    #[test]
    fn test_retry_delay_grows_linearly() {
        let config = InvoicingConfig::new("http://localhost").with_retry(3, Duration::from_millis(250));
        assert_eq!(config.retry_delay(1), Duration::from_millis(250));
        assert_eq!(config.retry_delay(2), Duration::from_millis(500));
        assert_eq!(config.retry_delay(3), Duration::from_millis(750));
    }

    #[test]
    fn test_builders() {
        let config = InvoicingConfig::new("http://localhost")
            .with_api_key("secret")
            .with_request_timeout(Duration::from_millis(1500))
            .without_circuit_breaker();
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout_ms, 1500);
        assert!(config.circuit_breaker.is_none());
    }
}
