// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the marketplace API.
//!
//! Every outbound request takes a token from its endpoint class's bucket
//! first. Connection failures and timeouts are retried with capped
//! exponential backoff; every other failure is classified and returned.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode, Url};
use restock_config::model::MarketplaceConfig;
use restock_core::RestockError;
use restock_resilience::RetryPolicy;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::endpoints::{EndpointBuckets, EndpointClass};
use crate::error::GatewayError;

/// Headers the marketplace uses to suggest a wait after a 429, in seconds.
const RETRY_AFTER_HEADERS: &[&str] = &["retry-after", "x-ratelimit-retry"];

/// One outbound request, relative to the gateway's base URL.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl GatewayRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: String,
}

impl GatewayResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        serde_json::from_str(&self.body).map_err(|e| GatewayError::Api {
            status: self.status,
            message: format!("failed to parse response body: {e}"),
        })
    }
}

/// Rate-limited, retrying client shared by every marketplace caller.
#[derive(Debug)]
pub struct RateLimitedGateway {
    client: reqwest::Client,
    base_url: String,
    buckets: EndpointBuckets,
    retry: RetryPolicy,
}

impl RateLimitedGateway {
    pub fn new(config: &MarketplaceConfig) -> Result<Self, RestockError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(token).map_err(|e| {
                    RestockError::Config(format!("invalid marketplace API token header value: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RestockError::Gateway {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            buckets: EndpointBuckets::from_config(config),
            retry: RetryPolicy::exponential(
                config.max_network_attempts,
                Duration::from_millis(config.backoff_base_ms),
                Duration::from_millis(config.backoff_cap_ms),
            ),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &GatewayRequest) -> Result<Url, GatewayError> {
        let mut url =
            Url::parse(&format!("{}{}", self.base_url, request.path)).map_err(|e| {
                GatewayError::Api {
                    status: 0,
                    message: format!("invalid request URL: {e}"),
                }
            })?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    /// Send `request` under the budget of `class`.
    pub async fn call(
        &self,
        class: EndpointClass,
        request: GatewayRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = self.url_for(&request)?;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let waited = self.buckets.get(class).acquire().await;
            if !waited.is_zero() {
                metrics::histogram!("restock_gateway_rate_limit_wait_seconds", "class" => class.to_string())
                    .record(waited.as_secs_f64());
                debug!(%class, waited_ms = waited.as_millis() as u64, "waited for rate limit token");
            }

            let mut builder = self.client.request(request.method.clone(), url.clone());
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) if is_transient(&e) && self.retry.should_retry(attempt) => {
                    self.back_off(class, attempt, &e).await;
                    continue;
                }
                Err(e) => return Err(network_failure(class, attempt, e)),
            };

            let status = response.status();
            debug!(%class, status = %status, attempt, path = %request.path, "marketplace response");
            let suggested_wait = retry_after(response.headers());
            let body = if status == StatusCode::TOO_MANY_REQUESTS {
                String::new()
            } else {
                match response.text().await {
                    Ok(body) => body,
                    Err(e) if is_transient(&e) && self.retry.should_retry(attempt) => {
                        self.back_off(class, attempt, &e).await;
                        continue;
                    }
                    Err(e) if is_transient(&e) => {
                        return Err(network_failure(class, attempt, e));
                    }
                    Err(e) if status.is_success() => {
                        return Err(GatewayError::Api {
                            status: status.as_u16(),
                            message: format!("failed to read response body: {e}"),
                        });
                    }
                    Err(_) => String::new(),
                }
            };

            let result = classify(status, suggested_wait, body, &request.path);
            let outcome = match &result {
                Ok(_) => "ok",
                Err(GatewayError::RateLimited { .. }) => "rate_limited",
                Err(_) => "error",
            };
            metrics::counter!("restock_gateway_requests_total", "class" => class.to_string(), "outcome" => outcome).increment(1);
            return result;
        }
    }

    async fn back_off(&self, class: EndpointClass, attempt: u32, error: &reqwest::Error) {
        let delay = self.retry.delay_for_attempt(attempt);
        warn!(%class, attempt, delay_ms = delay.as_millis() as u64, error = %error, "network error, retrying");
        tokio::time::sleep(delay).await;
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        class: EndpointClass,
        request: GatewayRequest,
    ) -> Result<T, GatewayError> {
        self.call(class, request).await?.json()
    }
}

/// Timeouts and connection failures; everything else is not worth a retry.
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

fn network_failure(class: EndpointClass, attempts: u32, source: reqwest::Error) -> GatewayError {
    metrics::counter!("restock_gateway_requests_total", "class" => class.to_string(), "outcome" => "network_error").increment(1);
    GatewayError::Network { attempts, source }
}

fn classify(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: String,
    path: &str,
) -> Result<GatewayResponse, GatewayError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(GatewayError::RateLimited { retry_after });
    }

    match status {
        s if s.is_success() => Ok(GatewayResponse {
            status: s.as_u16(),
            body,
        }),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GatewayError::Auth {
            status: status.as_u16(),
            body,
        }),
        StatusCode::NOT_FOUND => Err(GatewayError::NotFound {
            path: path.to_string(),
        }),
        s if s.is_server_error() => Err(GatewayError::Server {
            status: s.as_u16(),
            body,
        }),
        s => Err(GatewayError::Api {
            status: s.as_u16(),
            message: body,
        }),
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    RETRY_AFTER_HEADERS.iter().find_map(|name| {
        let secs: f64 = headers.get(*name)?.to_str().ok()?.trim().parse().ok()?;
        (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(base_url: &str) -> RateLimitedGateway {
        let config = MarketplaceConfig {
            base_url: base_url.to_string(),
            api_token: Some("test-token".into()),
            backoff_base_ms: 10,
            backoff_cap_ms: 40,
            ..MarketplaceConfig::default()
        };
        RateLimitedGateway::new(&config).unwrap()
    }

    #[tokio::test]
    async fn successful_get_sends_token_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/warehouses"))
            .and(header("authorization", "test-token"))
            .and(query_param("locale", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let response = gateway(&server.uri())
            .call(
                EndpointClass::Warehouses,
                GatewayRequest::get("/api/v1/warehouses").query("locale", "en"),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "[]");
    }

    #[tokio::test]
    async fn rate_limit_surfaces_retry_after_without_retrying() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .expect(1)
            .mount(&server)
            .await;

        let err = gateway(&server.uri())
            .call(EndpointClass::General, GatewayRequest::get("/ping"))
            .await
            .unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    }

    #[tokio::test]
    async fn marketplace_retry_header_is_understood() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("X-Ratelimit-Retry", "2"))
            .mount(&server)
            .await;

        let err = gateway(&server.uri())
            .call(EndpointClass::General, GatewayRequest::get("/ping"))
            .await
            .unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .expect(1)
            .mount(&server)
            .await;

        let err = gateway(&server.uri())
            .call(EndpointClass::General, GatewayRequest::get("/ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Auth { status: 401, .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn not_found_and_server_errors_are_classified() {
        let server = MockServer::start().await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let gw = gateway(&server.uri());
        let missing = gw
            .call(EndpointClass::General, GatewayRequest::get("/missing"))
            .await
            .unwrap_err();
        assert!(matches!(missing, GatewayError::NotFound { .. }));

        let broken = gw
            .call(EndpointClass::General, GatewayRequest::get("/broken"))
            .await
            .unwrap_err();
        assert!(matches!(broken, GatewayError::Server { status: 503, .. }));
    }

    #[tokio::test]
    async fn connection_failures_are_retried_then_reported() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let err = gateway(&uri)
            .call(EndpointClass::General, GatewayRequest::get("/ping"))
            .await
            .unwrap_err();
        match err {
            GatewayError::Network { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timed_out_request_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1_500)))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[1]"))
            .mount(&server)
            .await;

        let config = MarketplaceConfig {
            base_url: server.uri(),
            request_timeout_secs: 1,
            backoff_base_ms: 10,
            backoff_cap_ms: 40,
            ..MarketplaceConfig::default()
        };
        let body: Vec<u32> = RateLimitedGateway::new(&config)
            .unwrap()
            .get_json(EndpointClass::General, GatewayRequest::get("/slow"))
            .await
            .unwrap();
        assert_eq!(body, vec![1]);
    }

    #[tokio::test]
    async fn undecodable_body_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = gateway(&server.uri())
            .get_json::<Vec<u32>>(EndpointClass::General, GatewayRequest::get("/ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Api { status: 200, .. }));
    }
}
