//! Invoicing adapter errors

use thiserror::Error;

use core_kernel::PortError;

/// Errors raised while talking to the invoicing API
#[derive(Debug, Error)]
pub enum InvoicingError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Connection failed: {0}")]
    Connection(String),

    /// The API answered with a non-success status
    #[error("Invoicing API returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Circuit breaker is open")]
    CircuitOpen,
}

impl InvoicingError {
    /// Classifies a reqwest failure
    pub(crate) fn from_reqwest(error: reqwest::Error, timeout_ms: u64) -> Self {
        if error.is_timeout() {
            InvoicingError::Timeout { timeout_ms }
        } else if error.is_decode() || error.is_body() {
            InvoicingError::Decode(error.to_string())
        } else {
            InvoicingError::Connection(error.to_string())
        }
    }

    /// Whether another attempt may succeed
    ///
    /// Timeouts, connection failures, 429 and 5xx responses are retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            InvoicingError::Timeout { .. } | InvoicingError::Connection(_) => true,
            InvoicingError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<InvoicingError> for PortError {
    fn from(error: InvoicingError) -> Self {
        match error {
            InvoicingError::Configuration(message) => PortError::internal(message),
            InvoicingError::Timeout { timeout_ms } => PortError::timeout("fetch_external_payments", timeout_ms),
            InvoicingError::Connection(message) => PortError::connection(message),
            InvoicingError::Status { status, message, retry_after_secs } => match status {
                404 => PortError::not_found("Payments endpoint", message),
                401 | 403 => PortError::Unauthorized { message },
                429 => PortError::RateLimited {
                    retry_after_secs: retry_after_secs.unwrap_or(60),
                },
                500..=599 => PortError::unavailable(format!("invoicing API ({status})")),
                _ => PortError::internal(format!("invoicing API returned {status}: {message}")),
            },
            InvoicingError::Decode(message) => PortError::transformation(message),
            InvoicingError::CircuitOpen => PortError::unavailable("Circuit breaker is open"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> InvoicingError {
        InvoicingError::Status {
            status,
            message: "error".to_string(),
            retry_after_secs: None,
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(InvoicingError::Timeout { timeout_ms: 100 }.is_retryable());
        assert!(InvoicingError::Connection("refused".to_string()).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!InvoicingError::Decode("bad".to_string()).is_retryable());
        assert!(!InvoicingError::CircuitOpen.is_retryable());
    }

    #[test]
    fn test_status_mapping() {
        assert!(PortError::from(status(404)).is_not_found());
        assert!(matches!(PortError::from(status(403)), PortError::Unauthorized { .. }));
        assert!(matches!(PortError::from(status(502)), PortError::ServiceUnavailable { .. }));
        assert!(matches!(PortError::from(status(418)), PortError::Internal { .. }));
        assert!(matches!(
            PortError::from(status(429)),
            PortError::RateLimited { retry_after_secs: 60 }
        ));
    }

    #[test]
    fn test_transport_mapping() {
        let timeout = PortError::from(InvoicingError::Timeout { timeout_ms: 250 });
        assert!(matches!(timeout, PortError::Timeout { duration_ms: 250, .. }));
        assert!(timeout.is_transient());

        let open = PortError::from(InvoicingError::CircuitOpen);
        assert!(open.to_string().contains("Circuit breaker is open"));

        let decode = PortError::from(InvoicingError::Decode("expected value".to_string()));
        assert!(matches!(decode, PortError::Transformation { .. }));
    }
}
