//! Tests for the HTTP executor

use super::*;
use crate::config::HarvestConfig;
use crate::error::Error;
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> HarvestConfig {
    HarvestConfig::default()
        .with_base_url(server.uri())
        .with_request_delay(0.0)
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

#[test]
fn test_build_url() {
    let config = HarvestConfig::default().with_base_url("https://api.example.com/v3/");
    let executor = RequestExecutor::new(&config).unwrap();

    assert_eq!(
        executor.build_url("/search"),
        "https://api.example.com/v3/search"
    );
    assert_eq!(
        executor.build_url("models/abc"),
        "https://api.example.com/v3/models/abc"
    );
    assert_eq!(
        executor.build_url("https://other.example.com/search?cursor=x"),
        "https://other.example.com/search?cursor=x"
    );
}

#[test]
fn test_server_error_budget_is_capped() {
    let mut config = HarvestConfig::default();
    config.server_error_retries = 10;
    let executor = RequestExecutor::new(&config).unwrap();
    let debug = format!("{executor:?}");
    assert!(debug.contains("server_error_retries: 3"));
}

#[tokio::test]
async fn test_success_returns_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "roman"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"uid": "a"}],
            "next": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(&test_config(&server)).unwrap();
    let params = vec![("q".to_string(), "roman".to_string())];
    let outcome = executor.execute("/search", Some(&params)).await.unwrap();

    match outcome {
        RequestOutcome::Success(body) => assert_eq!(body["results"][0]["uid"], "a"),
        other => panic!("expected success, got {other:?}"),
    }

    let stats = executor.stats();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.successful, 1);
}

#[tokio::test]
async fn test_headers_attached_to_every_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("Authorization", "Token secret123"))
        .and(header("User-Agent", "test-agent/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server)
        .with_api_token("secret123")
        .with_user_agent("test-agent/1.0");
    let executor = RequestExecutor::new(&config).unwrap();

    let body = executor.execute_json("/me", None).await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_no_authorization_without_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(&test_config(&server)).unwrap();
    executor.execute_json("/anything", None).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    assert!(requests[0].headers.get("user-agent").is_some());
}

#[tokio::test]
async fn test_retry_after_is_honoured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"page": 2})))
        .mount(&server)
        .await;

    let config = test_config(&server).with_request_delay(0.01);
    let executor = RequestExecutor::new(&config).unwrap();

    let start = Instant::now();
    let body = executor.execute_json("/search", None).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(body["page"], 2);
    assert!(elapsed >= Duration::from_secs(2), "waited only {elapsed:?}");
    assert_eq!(request_count(&server).await, 2);

    let stats = executor.stats();
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.throttled, 1);
    assert_eq!(stats.successful, 1);
    assert_eq!(executor.rate_limit_state().retry_after, Some(2));
}

#[tokio::test]
async fn test_perpetual_throttling_exhausts_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let config = test_config(&server).with_max_retries(5);
    let executor = RequestExecutor::new(&config).unwrap();

    let err = executor.execute("/search", None).await.unwrap_err();

    assert!(matches!(err, Error::RateLimitExhausted { attempts: 6 }));
    assert_eq!(request_count(&server).await, 6);

    let stats = executor.stats();
    assert_eq!(stats.total_requests, 6);
    assert_eq!(stats.throttled, 6);
}

#[tokio::test]
async fn test_throttling_with_zero_budget_fails_after_one_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let config = test_config(&server).with_max_retries(0);
    let executor = RequestExecutor::new(&config).unwrap();

    let err = executor.execute("/search", None).await.unwrap_err();
    assert!(matches!(err, Error::RateLimitExhausted { attempts: 1 }));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_forbidden_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("invalid token"))
        .mount(&server)
        .await;

    // a large delay would make any backoff visible
    let config = test_config(&server).with_request_delay(5.0);
    let executor = RequestExecutor::new(&config).unwrap();

    let start = Instant::now();
    let outcome = executor.execute("/search", None).await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(2));

    match outcome {
        RequestOutcome::ClientError { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "invalid token");
        }
        other => panic!("expected client error, got {other:?}"),
    }
    assert_eq!(request_count(&server).await, 1);
    assert_eq!(executor.stats().errors, 1);
}

#[tokio::test]
async fn test_not_found_surfaces_as_client_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(&test_config(&server)).unwrap();
    let err = executor.execute_json("/models/missing", None).await.unwrap_err();

    assert!(matches!(err, Error::ClientError { status: 404, .. }));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_server_errors_retried_three_times() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(&test_config(&server)).unwrap();
    let outcome = executor.execute("/search", None).await.unwrap();

    assert!(matches!(outcome, RequestOutcome::ServerError { status: 503 }));
    assert_eq!(request_count(&server).await, 4);

    let stats = executor.stats();
    assert_eq!(stats.total_requests, 4);
    assert_eq!(stats.errors, 4);
}

#[tokio::test]
async fn test_server_error_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": 1})))
        .mount(&server)
        .await;

    let config = test_config(&server).with_request_delay(0.005);
    let executor = RequestExecutor::new(&config).unwrap();
    let body = executor.execute_json("/search", None).await.unwrap();

    assert_eq!(body["ok"], 1);
    assert_eq!(request_count(&server).await, 3);

    let stats = executor.stats();
    assert_eq!(stats.errors, 2);
    assert_eq!(stats.successful, 1);
    assert_eq!(
        stats.total_requests,
        stats.successful + stats.throttled + stats.errors
    );
}

#[tokio::test]
async fn test_network_error_is_not_retried() {
    // grab a free port, then close it so the connection is refused
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = HarvestConfig::default()
        .with_base_url(format!("http://127.0.0.1:{port}"))
        .with_request_delay(0.0);
    let executor = RequestExecutor::new(&config).unwrap();

    let outcome = executor.execute("/search", None).await.unwrap();
    assert!(matches!(outcome, RequestOutcome::NetworkError(_)));

    let stats = executor.stats();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.errors, 1);
}

#[tokio::test]
async fn test_non_json_success_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(&test_config(&server)).unwrap();
    let err = executor.execute("/search", None).await.unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(executor.stats().errors, 1);
}

#[tokio::test]
async fn test_rate_limit_headers_tracked_on_errors_too() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-RateLimit-Limit", "100")
                .insert_header("X-RateLimit-Remaining", "99")
                .set_body_json(json!({})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/denied"))
        .respond_with(ResponseTemplate::new(403).insert_header("RateLimit-Remaining", "98"))
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(&test_config(&server)).unwrap();
    executor.execute_json("/ok", None).await.unwrap();
    executor.execute_json("/denied", None).await.unwrap_err();

    let state = executor.rate_limit_state();
    assert_eq!(state.limit, Some(100));
    assert_eq!(state.remaining, Some(98));
}

#[tokio::test]
async fn test_pacing_applies_to_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let config = test_config(&server).with_request_delay(0.1);
    let executor = RequestExecutor::new(&config).unwrap();

    let start = Instant::now();
    executor.execute_json("/search", None).await.unwrap();
    // backoff alone is base * 2 = 200ms, the limiter gap is covered by it
    assert!(start.elapsed() >= Duration::from_millis(195));
}

#[tokio::test]
async fn test_oversized_retry_after_on_success_is_harmless() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Retry-After", "99999999999999999999")
                .set_body_json(json!({"ok": true})),
        )
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(&test_config(&server)).unwrap();
    let body = executor.execute_json("/x", None).await.unwrap();

    assert_eq!(body["ok"], true);
    assert_eq!(
        executor.rate_limit_state().retry_after,
        Some(MAX_RETRY_AFTER.as_secs())
    );
}

#[tokio::test]
async fn test_throttle_and_server_budgets_are_separate() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": 1})))
        .mount(&server)
        .await;

    // one retry of each kind; a shared budget would give up on the 502
    let mut config = test_config(&server).with_max_retries(1);
    config.server_error_retries = 1;
    let executor = RequestExecutor::new(&config).unwrap();

    let body = executor.execute_json("/search", None).await.unwrap();
    assert_eq!(body["ok"], 1);
    assert_eq!(request_count(&server).await, 3);

    let stats = executor.stats();
    assert_eq!(stats.throttled, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.successful, 1);
}

#[tokio::test]
async fn test_server_retries_do_not_refill_throttle_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let mut config = test_config(&server).with_max_retries(1);
    config.server_error_retries = 1;
    let executor = RequestExecutor::new(&config).unwrap();

    let err = executor.execute("/search", None).await.unwrap_err();
    assert!(matches!(err, Error::RateLimitExhausted { attempts: 3 }));
    assert_eq!(request_count(&server).await, 3);
}
