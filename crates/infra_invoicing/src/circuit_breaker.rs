//! Circuit breaker for calls to the invoicing API
//!
//! After `failure_threshold` consecutive failures the breaker opens and calls
//! are rejected without touching the network. Once `reset_timeout_secs` have
//! passed it half-opens: calls go through as probes, `success_threshold`
//! successes close it again and any failure re-opens it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};

use core_kernel::CircuitBreakerConfig;

/// Observable state of a breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    failure_count: AtomicU64,
    success_count: AtomicU64,
    is_open: AtomicBool,
    opened_at: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            failure_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            is_open: AtomicBool::new(false),
            opened_at: RwLock::new(None),
        }
    }

    fn reset_timeout(&self) -> Duration {
        Duration::from_secs(self.config.reset_timeout_secs)
    }

    pub async fn state(&self) -> CircuitState {
        if !self.is_open.load(Ordering::Acquire) {
            return CircuitState::Closed;
        }
        match *self.opened_at.read().await {
            Some(opened) if opened.elapsed() >= self.reset_timeout() => CircuitState::HalfOpen,
            _ => CircuitState::Open,
        }
    }

    /// Whether a call may be attempted
    pub async fn is_available(&self) -> bool {
        self.state().await != CircuitState::Open
    }

    pub async fn record_success(&self) {
        self.failure_count.store(0, Ordering::Release);
        if !self.is_open.load(Ordering::Acquire) {
            return;
        }

        let successes = self.success_count.fetch_add(1, Ordering::AcqRel) + 1;
        if successes >= u64::from(self.config.success_threshold) {
            self.is_open.store(false, Ordering::Release);
            self.success_count.store(0, Ordering::Release);
            *self.opened_at.write().await = None;
            info!("invoicing circuit breaker closed");
        }
    }

    pub async fn record_failure(&self) {
        self.success_count.store(0, Ordering::Release);

        if self.is_open.load(Ordering::Acquire) {
            // A failed probe restarts the wait
            *self.opened_at.write().await = Some(Instant::now());
            return;
        }

        let failures = self.failure_count.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= u64::from(self.config.failure_threshold) {
            *self.opened_at.write().await = Some(Instant::now());
            self.is_open.store(true, Ordering::Release);
            warn!(failures, "invoicing circuit breaker opened");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(reset_timeout_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            reset_timeout_secs,
            success_threshold: 2,
        })
    }

    #[tokio::test]
    async fn test_initially_closed() {
        let cb = breaker(60);
        assert_eq!(cb.state().await, CircuitState::Closed);
        assert!(cb.is_available().await);
    }

    #[tokio::test]
    async fn test_opens_after_threshold() {
        let cb = breaker(60);
        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(!cb.is_available().await);
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let cb = breaker(60);
        cb.record_failure().await;
        cb.record_success().await;
        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_closes_after_successes() {
        let cb = breaker(0);
        cb.record_failure().await;
        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        cb.record_success().await;
        assert_eq!(cb.state().await, CircuitState::HalfOpen);
        cb.record_success().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_failed_probe_keeps_breaker_open() {
        let cb = breaker(0);
        cb.record_failure().await;
        cb.record_failure().await;
        cb.record_success().await;
        cb.record_failure().await;

        // the success count restarts after a failed probe
        cb.record_success().await;
        assert_eq!(cb.state().await, CircuitState::HalfOpen);
    }
}
