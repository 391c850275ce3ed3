use httpmock::prelude::*;
use rescue_ai::{
    AdvisoryClient, AdvisoryError, AdvisoryRequest, AdvisoryRoute, HttpAdvisoryClient,
    HttpAdvisoryConfig, Message,
};
use serde_json::json;
use std::time::Duration;

fn proxy_config(endpoint: String) -> HttpAdvisoryConfig {
    HttpAdvisoryConfig {
        endpoint,
        route: AdvisoryRoute::Proxy,
        api_key: None,
        model: "deepseek-chat".to_string(),
        temperature: Some(0.7),
        max_tokens: Some(100),
        request_timeout_ms: 5_000,
        max_retries: 0,
        retry_jitter: false,
        retry_budget_ms: 0,
    }
}

fn sample_request() -> AdvisoryRequest {
    AdvisoryRequest {
        messages: vec![
            Message::system("dispatcher"),
            Message::user("{\"batteryPercent\":85.0}"),
        ],
    }
}

#[tokio::test]
async fn proxy_client_posts_messages_and_extracts_direct_content() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .header_exists("x-rescue-request-id")
            .header("x-rescue-retry-attempt", "0")
            .json_body(json!({
                "messages": [
                    {"role": "system", "content": "dispatcher"},
                    {"role": "user", "content": "{\"batteryPercent\":85.0}"}
                ]
            }));
        then.status(200).json_body(json!({"content": "Hold position."}));
    });

    let client = HttpAdvisoryClient::new(proxy_config(server.url("/api/chat")))
        .expect("client should be created");
    let reply = client
        .request_advice(sample_request())
        .await
        .expect("request should succeed");

    mock.assert();
    assert_eq!(reply.advice_text().as_deref(), Some("Hold position."));
}

#[tokio::test]
async fn provider_client_sends_bearer_key_and_model_parameters() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .header("authorization", "Bearer test-key")
            .json_body_includes(json!({"model": "deepseek-chat", "max_tokens": 100}).to_string());
        then.status(200).json_body(json!({
            "choices": [{"message": {"role": "assistant", "content": "Advance to grid B."}}]
        }));
    });

    let mut config = proxy_config(server.url("/chat/completions"));
    config.route = AdvisoryRoute::Provider;
    config.api_key = Some("test-key".to_string());
    let client = HttpAdvisoryClient::new(config).expect("client should be created");
    let reply = client
        .request_advice(sample_request())
        .await
        .expect("request should succeed");

    mock.assert();
    assert_eq!(reply.advice_text().as_deref(), Some("Advance to grid B."));
}

#[tokio::test]
async fn non_success_status_surfaces_as_http_status_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(500)
            .json_body(json!({"error": "DeepSeek API Key not configured"}));
    });

    let client = HttpAdvisoryClient::new(proxy_config(server.url("/api/chat")))
        .expect("client should be created");
    let error = client
        .request_advice(sample_request())
        .await
        .expect_err("500 must fail");

    match error {
        AdvisoryError::HttpStatus { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("not configured"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn client_retries_on_rate_limit_then_succeeds() {
    let server = MockServer::start();
    let first = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .header("x-rescue-retry-attempt", "0");
        then.status(429).body("rate limited");
    });
    let second = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .header("x-rescue-retry-attempt", "1");
        then.status(200).json_body(json!({"message": "ok after retry"}));
    });

    let mut config = proxy_config(server.url("/api/chat"));
    config.max_retries = 2;
    let client = HttpAdvisoryClient::new(config).expect("client should be created");
    let reply = client
        .request_advice(sample_request())
        .await
        .expect("retry should eventually succeed");

    assert_eq!(reply.advice_text().as_deref(), Some("ok after retry"));
    first.assert_calls(1);
    second.assert_calls(1);
}

#[tokio::test]
async fn rate_limit_hint_beyond_call_budget_fails_without_waiting() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(429)
            .header("retry-after", "30")
            .body("slow down");
    });

    let mut config = proxy_config(server.url("/api/chat"));
    config.max_retries = 3;
    config.retry_budget_ms = 2_000;
    let client = HttpAdvisoryClient::new(config).expect("client should be created");
    let started = std::time::Instant::now();
    let error = client
        .request_advice(sample_request())
        .await
        .expect_err("retry-after beyond the budget must fail fast");

    mock.assert_calls(1);
    assert!(matches!(error, AdvisoryError::HttpStatus { status: 429, .. }));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn client_does_not_retry_client_errors() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(400).body("bad request");
    });

    let mut config = proxy_config(server.url("/api/chat"));
    config.max_retries = 3;
    let client = HttpAdvisoryClient::new(config).expect("client should be created");
    let error = client
        .request_advice(sample_request())
        .await
        .expect_err("400 must fail");

    mock.assert_calls(1);
    assert!(matches!(error, AdvisoryError::HttpStatus { status: 400, .. }));
}

#[tokio::test]
async fn regression_slow_endpoint_reports_timeout() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(200)
            .delay(Duration::from_millis(200))
            .json_body(json!({"content": "late"}));
    });

    let mut config = proxy_config(server.url("/api/chat"));
    config.request_timeout_ms = 40;
    let client = HttpAdvisoryClient::new(config).expect("client should be created");
    let error = client
        .request_advice(sample_request())
        .await
        .expect_err("request should time out");

    assert!(
        matches!(error, AdvisoryError::Timeout { timeout_ms: 40 }),
        "expected timeout, got {error:?}"
    );
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(200).body("not json");
    });

    let client = HttpAdvisoryClient::new(proxy_config(server.url("/api/chat")))
        .expect("client should be created");
    let error = client
        .request_advice(sample_request())
        .await
        .expect_err("invalid JSON must fail");

    assert!(matches!(error, AdvisoryError::Serde(_)));
}
