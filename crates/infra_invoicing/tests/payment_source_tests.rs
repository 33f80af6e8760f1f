//! Tests for the invoicing adapter against a local mock of the payments API

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use core_kernel::{AdapterHealth, CircuitBreakerConfig, HealthCheckable, PortError};
use domain_ledger::{
    AlertSeverity, ClosureService, InMemoryClosureStore, LedgerSettings, PaymentSource, ProposedTransaction,
};
use infra_invoicing::{InvoicingConfig, ManagerPaymentSource};
use test_utils::{init_test_tracing, AccountFixtures, ConceptFixtures, TemporalFixtures, UserFixtures};

/// Serves the router on an ephemeral port and returns its base URL
async fn spawn_api(router: Router) -> String {
    init_test_tracing();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Answers every request with the next status in `script`, then 200 with `payments`
fn scripted_api(script: Vec<StatusCode>, payments: serde_json::Value, hits: Arc<AtomicUsize>) -> Router {
    Router::new().route(
        "/payments",
        get(move || {
            let hits = hits.clone();
            let script = script.clone();
            let payments = payments.clone();
            async move {
                let n = hits.fetch_add(1, Ordering::SeqCst);
                match script.get(n) {
                    Some(status) => (*status, Json(json!({ "error": "scripted failure" }))).into_response(),
                    None => Json(json!({ "payments": payments })).into_response(),
                }
            }
        }),
    )
}

fn fast_config(base_url: String) -> InvoicingConfig {
    InvoicingConfig::new(base_url)
        .with_request_timeout(Duration::from_secs(2))
        .with_retry(3, Duration::from_millis(10))
}

fn sample_payments() -> serde_json::Value {
    json!([
        {
            "key": "a1",
            "date": "2024-03-15",
            "paidFrom": "Caja",
            "description": "Invoice 1043",
            "payee": "Conaprole",
            "amount": { "value": 320, "currency": "UYU" }
        },
        {
            "key": "b2",
            "description": null,
            "payee": "UTE",
            "amount": { "value": 1250.5 }
        }
    ])
}

// ============================================================================
// Request Tests
// ============================================================================

mod request_tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_sends_date_and_credentials() {
        let seen: Arc<std::sync::Mutex<Option<(String, String)>>> = Arc::default();
        let recorder = seen.clone();
        let router = Router::new().route(
            "/api/payments",
            get(move |Query(params): Query<HashMap<String, String>>, headers: HeaderMap| {
                let recorder = recorder.clone();
                async move {
                    let date = params.get("date").cloned().unwrap_or_default();
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    *recorder.lock().unwrap() = Some((date, auth));
                    Json(json!({ "payments": sample_payments() }))
                }
            }),
        );
        let base = spawn_api(router).await;

        let source = ManagerPaymentSource::new(fast_config(format!("{base}/api")).with_api_key("token-123")).unwrap();
        let payments = source
            .fetch_external_payments_for_date(TemporalFixtures::today())
            .await
            .unwrap();

        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].amount, dec!(320));
        assert_eq!(payments[0].payee.as_deref(), Some("Conaprole"));
        assert_eq!(payments[0].reference.as_deref(), Some("Invoice 1043"));
        assert_eq!(payments[1].amount, dec!(1250.50));
        assert!(payments[1].reference.is_none());

        let (date, auth) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(date, "2024-03-15");
        assert_eq!(auth, "Bearer token-123");
    }

    #[tokio::test]
    async fn test_non_list_payload_is_empty() {
        let router = Router::new().route("/payments", get(|| async { Json(json!({ "payments": null })) }));
        let base = spawn_api(router).await;

        let source = ManagerPaymentSource::new(fast_config(base)).unwrap();
        let payments = source
            .fetch_external_payments_for_date(TemporalFixtures::today())
            .await
            .unwrap();
        assert!(payments.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_transformation_error() {
        let router = Router::new().route("/payments", get(|| async { "<html>maintenance</html>" }));
        let base = spawn_api(router).await;

        let source = ManagerPaymentSource::new(fast_config(base)).unwrap();
        let result = source.fetch_external_payments_for_date(TemporalFixtures::today()).await;
        assert!(matches!(result, Err(PortError::Transformation { .. })));
    }

    #[tokio::test]
    async fn test_slow_api_times_out() {
        let router = Router::new().route(
            "/payments",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({ "payments": [] }))
            }),
        );
        let base = spawn_api(router).await;

        let config = InvoicingConfig::new(base)
            .with_request_timeout(Duration::from_millis(50))
            .with_retry(0, Duration::ZERO);
        let source = ManagerPaymentSource::new(config).unwrap();
        let result = source.fetch_external_payments_for_date(TemporalFixtures::today()).await;
        assert!(matches!(result, Err(PortError::Timeout { duration_ms: 50, .. })));
    }
}

// ============================================================================
// Retry Tests
// ============================================================================

mod retry_tests {
    use super::*;

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = scripted_api(
            vec![StatusCode::SERVICE_UNAVAILABLE, StatusCode::BAD_GATEWAY],
            sample_payments(),
            hits.clone(),
        );
        let base = spawn_api(router).await;

        let source = ManagerPaymentSource::new(fast_config(base)).unwrap();
        let payments = source.fetch_payments(TemporalFixtures::today()).await.unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retry_attempts() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = scripted_api(vec![StatusCode::INTERNAL_SERVER_ERROR; 10], json!([]), hits.clone());
        let base = spawn_api(router).await;

        let source = ManagerPaymentSource::new(fast_config(base).with_retry(2, Duration::from_millis(5))).unwrap();
        let result = source.fetch_external_payments_for_date(TemporalFixtures::today()).await;
        assert!(matches!(result, Err(PortError::ServiceUnavailable { .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = scripted_api(vec![StatusCode::UNAUTHORIZED], json!([]), hits.clone());
        let base = spawn_api(router).await;

        let source = ManagerPaymentSource::new(fast_config(base)).unwrap();
        let result = source.fetch_external_payments_for_date(TemporalFixtures::today()).await;
        assert!(matches!(result, Err(PortError::Unauthorized { .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_honours_retry_after() {
        let router = Router::new().route(
            "/payments",
            get(|| async {
                let mut response: Response = (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
                response
                    .headers_mut()
                    .insert("retry-after", axum::http::HeaderValue::from_static("7"));
                response
            }),
        );
        let base = spawn_api(router).await;

        let source = ManagerPaymentSource::new(fast_config(base).with_retry(0, Duration::ZERO)).unwrap();
        let result = source.fetch_external_payments_for_date(TemporalFixtures::today()).await;
        assert!(matches!(result, Err(PortError::RateLimited { retry_after_secs: 7 })));
    }
}

// ============================================================================
// Circuit Breaker Tests
// ============================================================================

mod circuit_breaker_tests {
    use super::*;

    #[tokio::test]
    async fn test_open_breaker_short_circuits() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = scripted_api(vec![StatusCode::SERVICE_UNAVAILABLE; 10], json!([]), hits.clone());
        let base = spawn_api(router).await;

        let config = fast_config(base)
            .with_retry(0, Duration::ZERO)
            .with_circuit_breaker(CircuitBreakerConfig {
                failure_threshold: 2,
                reset_timeout_secs: 60,
                success_threshold: 1,
            });
        let source = ManagerPaymentSource::new(config).unwrap();
        let today = TemporalFixtures::today();

        assert!(source.fetch_external_payments_for_date(today).await.is_err());
        assert!(source.fetch_external_payments_for_date(today).await.is_err());
        assert!(source.is_circuit_open().await);

        let result = source.fetch_external_payments_for_date(today).await;
        match result {
            Err(PortError::ServiceUnavailable { service }) => assert!(service.contains("Circuit breaker")),
            other => panic!("expected an open breaker, got {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        let health = source.health_check().await;
        assert_eq!(health.status, AdapterHealth::Degraded);
    }

    #[tokio::test]
    async fn test_client_errors_do_not_open_breaker() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = scripted_api(vec![StatusCode::NOT_FOUND; 10], json!([]), hits.clone());
        let base = spawn_api(router).await;

        let config = fast_config(base).with_circuit_breaker(CircuitBreakerConfig {
            failure_threshold: 1,
            reset_timeout_secs: 60,
            success_threshold: 1,
        });
        let source = ManagerPaymentSource::new(config).unwrap();

        for _ in 0..3 {
            let result = source.fetch_external_payments_for_date(TemporalFixtures::today()).await;
            assert!(matches!(result, Err(PortError::NotFound { .. })));
        }
        assert!(!source.is_circuit_open().await);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}

// ============================================================================
// Health And Reconciliation Tests
// ============================================================================

mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let router = Router::new().route("/payments", get(|| async { Json(json!({ "payments": [] })) }));
        let base = spawn_api(router).await;
        let source = ManagerPaymentSource::new(fast_config(base)).unwrap();

        let health = source.health_check().await;
        assert_eq!(health.status, AdapterHealth::Healthy);
        assert_eq!(health.adapter_id, "invoicing-payment-source");
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = ManagerPaymentSource::new(fast_config(format!("http://{addr}"))).unwrap();
        let health = source.health_check().await;
        assert_eq!(health.status, AdapterHealth::Unhealthy);
        assert!(health.message.is_some());
    }

    #[tokio::test]
    async fn test_closure_alerts_through_service() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = scripted_api(vec![], sample_payments(), hits.clone());
        let base = spawn_api(router).await;
        let source = ManagerPaymentSource::new(fast_config(base)).unwrap();

        let service = ClosureService::new(Arc::new(InMemoryClosureStore::new()), LedgerSettings::default())
            .unwrap()
            .with_clock(Arc::new(TemporalFixtures::clock()))
            .with_payment_source(Arc::new(source));

        let closure = service
            .open_closure(&UserFixtures::owner(), service.today(), AccountFixtures::opening_balances())
            .await
            .unwrap();
        service
            .add_transaction(
                &closure.id,
                ProposedTransaction::new(ConceptFixtures::suppliers(), AccountFixtures::vault(), dec!(320))
                    .with_description("Dairy - Conaprole"),
            )
            .await
            .unwrap();
        assert!(service.closure_alerts(&closure.id).await.unwrap().is_empty());

        service
            .add_transaction(
                &closure.id,
                ProposedTransaction::new(ConceptFixtures::suppliers(), AccountFixtures::vault(), dec!(45))
                    .with_description("Cleaning products"),
            )
            .await
            .unwrap();
        let alerts = service.closure_alerts(&closure.id).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    }
}
