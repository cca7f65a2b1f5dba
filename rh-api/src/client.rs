//! HTTP client for the ride-hailing REST API.
//!
//! Handles bearer authentication, base URL selection for the runtime
//! target, timeouts, retry with exponential backoff on gateway errors, and
//! mapping of HTTP failures onto `RhError`. Requests that may already have
//! reached the server are only re-sent when the method is idempotent.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use rh_core::auth::TokenStore;
use rh_core::config::ServerConfig;
use rh_core::constants;
use rh_core::error::{RhError, RhResult};
use rh_core::platform::RuntimeTarget;

use crate::response::ApiResponse;

/// Retry configuration for HTTP requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retries (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// HTTP status codes that trigger a retry.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
            retryable_statuses: vec![502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// Whether a response with `status` may be answered by re-sending.
    ///
    /// Non-idempotent requests only retry on 503, where the server refused
    /// the request instead of failing part way through it.
    pub fn retries_status(&self, method: &Method, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
            && (method.is_idempotent() || status == StatusCode::SERVICE_UNAVAILABLE.as_u16())
    }

    /// Whether a request that got no response may be re-sent.
    ///
    /// A failed connect never reached the server. A timeout may have, so
    /// only idempotent methods retry it.
    pub fn retries_send_error(method: &Method, timed_out: bool, connect_failed: bool) -> bool {
        connect_failed || (timed_out && method.is_idempotent())
    }
}

/// HTTP client for the ride-hailing server.
///
/// Reads the bearer token from the shared `TokenStore` on every request,
/// so a login or logout elsewhere takes effect immediately.
#[derive(Clone)]
pub struct ApiClient {
    inner: Client,
    /// Base URL including the API prefix (e.g. "https://example.com/api").
    api_root: String,
    tokens: Arc<dyn TokenStore>,
    timeout: Duration,
    retry_config: RetryConfig,
}

impl ApiClient {
    /// Create a client for the given runtime target.
    pub fn new(
        config: &ServerConfig,
        target: RuntimeTarget,
        tokens: Arc<dyn TokenStore>,
    ) -> RhResult<Self> {
        let base = config.api_base_url(target);
        if base.is_empty() {
            return Err(RhError::MissingConfig("server.api_url".into()));
        }

        let timeout = config.request_timeout();
        let inner = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(format!("{}/{}", constants::APP_NAME, constants::APP_VERSION))
            .build()
            .map_err(|e| RhError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner,
            api_root: format!("{base}{}", constants::API_PREFIX),
            tokens,
            timeout,
            retry_config: RetryConfig::default(),
        })
    }

    /// Set custom retry configuration.
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Get the API root URL.
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// The token store this client reads from.
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_root)
    }

    fn build_request(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> RequestBuilder {
        let mut builder = self.inner.request(method, url).timeout(self.timeout);
        if let Some(token) = self.tokens.token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(b) = body {
            builder = builder.json(b);
        }
        builder
    }

    /// Execute a request with exponential backoff retry.
    async fn request_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> RhResult<Response> {
        let url = self.url(path);
        debug!("{} {}", method, path);

        let mut last_error: Option<RhError> = None;

        for attempt in 0..=self.retry_config.max_retries {
            if attempt > 0 {
                let delay = self.calculate_retry_delay(attempt - 1);
                warn!(
                    "retrying {} {} (attempt {}/{}) after {}ms",
                    method,
                    path,
                    attempt + 1,
                    self.retry_config.max_retries + 1,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.build_request(method.clone(), &url, body).send().await {
                Ok(response) => {
                    let status = response.status();
                    if self.retry_config.retries_status(&method, status.as_u16())
                        && attempt < self.retry_config.max_retries
                    {
                        warn!("retryable status {} from {}", status.as_u16(), path);
                        last_error = Some(RhError::ServerError {
                            status: status.as_u16(),
                            message: format!("retryable status {status}"),
                        });
                        continue;
                    }
                    return Self::check_status(response).await;
                }
                Err(e) => {
                    let is_retryable =
                        RetryConfig::retries_send_error(&method, e.is_timeout(), e.is_connect());
                    let err = Self::classify_error(e);
                    if is_retryable && attempt < self.retry_config.max_retries {
                        warn!("retryable error on {}: {}", path, err);
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| RhError::Http("max retries exceeded".into())))
    }

    fn calculate_retry_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.retry_config.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(1u64 << attempt.min(16));
        let max_ms = self.retry_config.max_delay.as_millis() as u64;
        Duration::from_millis(delay_ms.min(max_ms))
    }

    // --- Public HTTP methods ---

    pub async fn get(&self, path: &str) -> RhResult<Response> {
        self.request_with_retry(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &serde_json::Value) -> RhResult<Response> {
        self.request_with_retry(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &serde_json::Value) -> RhResult<Response> {
        self.request_with_retry(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> RhResult<Response> {
        self.request_with_retry(Method::DELETE, path, None).await
    }

    /// GET + parse into the envelope.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RhResult<ApiResponse<T>> {
        let resp = self.get(path).await?;
        Self::parse_response(resp).await
    }

    /// POST + parse into the envelope.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> RhResult<ApiResponse<T>> {
        let resp = self.post(path, body).await?;
        Self::parse_response(resp).await
    }

    /// PUT + parse into the envelope.
    pub async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> RhResult<ApiResponse<T>> {
        let resp = self.put(path, body).await?;
        Self::parse_response(resp).await
    }

    /// Ping the server. Returns the round-trip latency.
    pub async fn health(&self) -> RhResult<Duration> {
        let start = Instant::now();
        let resp: ApiResponse = self.get_json("/health").await?;
        resp.into_unit("health check")?;
        Ok(start.elapsed())
    }

    pub async fn parse_response<T: DeserializeOwned>(
        response: Response,
    ) -> RhResult<ApiResponse<T>> {
        response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| RhError::Serialization(format!("failed to parse response: {e}")))
    }

    /// Map auth and server failures onto errors; pass everything else on.
    async fn check_status(response: Response) -> RhResult<Response> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RhError::AuthFailed(format!("server returned {status}")));
        }

        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(RhError::ServerError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response)
    }

    fn classify_error(e: reqwest::Error) -> RhError {
        if e.is_timeout() {
            RhError::Timeout(e.to_string())
        } else if e.is_connect() {
            RhError::Http(format!("connection failed: {e}"))
        } else {
            RhError::Http(e.to_string())
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_root", &self.api_root)
            .field("timeout", &self.timeout)
            .finish()
    }
}
