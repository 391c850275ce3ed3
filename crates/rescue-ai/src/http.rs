use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use rescue_core::new_correlation_id;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};

use crate::{
    retry::{is_retryable_http_error, parse_retry_after_ms, should_retry_status},
    AdvisoryClient, AdvisoryError, AdvisoryReply, AdvisoryRequest, RetrySchedule,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Where advisory requests are sent.
pub enum AdvisoryRoute {
    /// A forwarding proxy that owns the provider credentials; only
    /// `{messages}` is posted.
    #[default]
    Proxy,
    /// A chat-completions provider called directly with a bearer key and
    /// model parameters.
    Provider,
}

impl AdvisoryRoute {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Proxy => "proxy",
            Self::Provider => "provider",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpAdvisoryConfig {
    pub endpoint: String,
    pub route: AdvisoryRoute,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub request_timeout_ms: u64,
    pub max_retries: usize,
    pub retry_jitter: bool,
    /// Total wall time one call may spend across attempts; 0 is unbounded.
    pub retry_budget_ms: u64,
}

impl HttpAdvisoryConfig {
    pub fn retry_schedule(&self) -> RetrySchedule {
        RetrySchedule {
            max_retries: self.max_retries,
            jitter: self.retry_jitter,
            budget_ms: self.retry_budget_ms,
        }
    }
}

#[derive(Debug, Clone)]
/// reqwest-backed [`AdvisoryClient`].
pub struct HttpAdvisoryClient {
    client: reqwest::Client,
    config: HttpAdvisoryConfig,
}

impl HttpAdvisoryClient {
    pub fn new(config: HttpAdvisoryConfig) -> Result<Self, AdvisoryError> {
        if config.endpoint.trim().is_empty() {
            return Err(AdvisoryError::Configuration(
                "advisory endpoint URL is empty".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty());
        match (config.route, api_key) {
            (AdvisoryRoute::Provider, None) => {
                return Err(AdvisoryError::Configuration(
                    "provider route requires an API key".to_string(),
                ));
            }
            (_, Some(key)) => {
                let bearer = format!("Bearer {key}");
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&bearer).map_err(|e| {
                        AdvisoryError::Configuration(format!("invalid API key header: {e}"))
                    })?,
                );
            }
            (AdvisoryRoute::Proxy, None) => {}
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpAdvisoryConfig {
        &self.config
    }

    fn request_body(&self, request: &AdvisoryRequest) -> Result<Value, AdvisoryError> {
        build_request_body(request, &self.config)
    }
}

/// Serializes the request for the configured route.
pub(crate) fn build_request_body(
    request: &AdvisoryRequest,
    config: &HttpAdvisoryConfig,
) -> Result<Value, AdvisoryError> {
    let mut body = serde_json::to_value(request)?;
    if config.route == AdvisoryRoute::Provider {
        body["model"] = json!(config.model);
        if let Some(temperature) = config.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
    }
    Ok(body)
}

#[async_trait]
impl AdvisoryClient for HttpAdvisoryClient {
    async fn request_advice(
        &self,
        request: AdvisoryRequest,
    ) -> Result<AdvisoryReply, AdvisoryError> {
        let body = self.request_body(&request)?;
        let schedule = self.config.retry_schedule();
        let started = Instant::now();
        let elapsed_ms = || u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        for attempt in 0..=schedule.max_retries {
            let request_id = new_correlation_id("advice");
            tracing::debug!(
                request_id = request_id.as_str(),
                attempt,
                route = self.config.route.as_str(),
                "sending advisory request"
            );
            let response = self
                .client
                .post(&self.config.endpoint)
                .header("x-rescue-request-id", request_id)
                .header("x-rescue-retry-attempt", attempt.to_string())
                .json(&body)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let raw = response
                            .text()
                            .await
                            .map_err(|error| self.classify_transport_error(error))?;
                        let parsed = serde_json::from_str::<Value>(&raw)?;
                        return Ok(AdvisoryReply::new(parsed));
                    }

                    let retry_after_ms = parse_retry_after_ms(response.headers());
                    let raw = response.text().await.unwrap_or_default();
                    let delay_ms = if should_retry_status(status.as_u16()) {
                        schedule.next_delay_ms(attempt, elapsed_ms(), retry_after_ms)
                    } else {
                        None
                    };
                    if let Some(backoff_ms) = delay_ms {
                        tracing::debug!(
                            status = status.as_u16(),
                            backoff_ms,
                            "retrying advisory request"
                        );
                        sleep(Duration::from_millis(backoff_ms)).await;
                        continue;
                    }

                    return Err(AdvisoryError::HttpStatus {
                        status: status.as_u16(),
                        body: raw,
                    });
                }
                Err(error) => {
                    let delay_ms = if is_retryable_http_error(&error) {
                        schedule.next_delay_ms(attempt, elapsed_ms(), None)
                    } else {
                        None
                    };
                    if let Some(backoff_ms) = delay_ms {
                        tracing::debug!(error = %error, backoff_ms, "retrying advisory request");
                        sleep(Duration::from_millis(backoff_ms)).await;
                        continue;
                    }
                    return Err(self.classify_transport_error(error));
                }
            }
        }

        Err(AdvisoryError::InvalidResponse(
            "request retry loop terminated unexpectedly".to_string(),
        ))
    }
}

impl HttpAdvisoryClient {
    fn classify_transport_error(&self, error: reqwest::Error) -> AdvisoryError {
        if error.is_timeout() {
            AdvisoryError::Timeout {
                timeout_ms: self.config.request_timeout_ms,
            }
        } else {
            AdvisoryError::Http(error)
        }
    }
}
