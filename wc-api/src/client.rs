//! HTTP client for the chat backend REST API.
//!
//! Handles custom headers, timeout management, TLS certificate options,
//! exponential backoff retry, and request/response lifecycle.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use wc_core::config::{BackendConfig, SdkConfig};
use wc_core::constants;
use wc_core::error::{WcError, WcResult};
use wc_core::platform::Platform;

use crate::response::ServerResponse;

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
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            retryable_statuses: vec![502, 503, 504],
        }
    }
}

/// HTTP client for communicating with the chat backend.
///
/// Wraps reqwest::Client with header injection, retry logic, and error
/// classification. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Client,
    /// Base URL for the API (e.g. "https://chat.example.com/api/v1").
    api_root: String,
    /// Backend origin (scheme + host, no path).
    origin: String,
    /// Realtime socket endpoint handed to the channel.
    socket_url: String,
    /// Default request timeout.
    timeout: Duration,
    /// Custom headers from backend config.
    custom_headers: Vec<(String, String)>,
    /// Retry configuration.
    retry_config: RetryConfig,
}

impl ApiClient {
    /// Create a new ApiClient from backend configuration.
    pub fn new(config: &BackendConfig) -> WcResult<Self> {
        let sanitized_address = SdkConfig::sanitize_url(&config.api_url);
        if sanitized_address.is_empty() {
            return Err(WcError::MissingConfig("backend.api_url".into()));
        }

        let mut builder = Client::builder()
            .timeout(Duration::from_millis(config.api_timeout_ms))
            .connect_timeout(Duration::from_secs(15))
            .user_agent(Platform::user_agent())
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30));

        if config.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let inner = builder
            .build()
            .map_err(|e| WcError::Http(format!("failed to build HTTP client: {e}")))?;

        let origin = derive_origin(&sanitized_address);
        let api_root = format!("{origin}/api/{}", constants::API_VERSION);

        let mut custom_headers: Vec<(String, String)> = config
            .custom_headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        custom_headers.sort();

        Ok(Self {
            inner,
            api_root,
            origin,
            socket_url: config.effective_socket_url(),
            timeout: Duration::from_millis(config.api_timeout_ms),
            custom_headers,
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

    /// Get the backend origin.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Get the realtime socket URL.
    pub fn socket_url(&self) -> &str {
        &self.socket_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_root)
    }

    /// Apply custom headers to a request builder.
    fn apply_headers(&self, mut builder: RequestBuilder) -> RequestBuilder {
        for (key, value) in &self.custom_headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        builder
    }

    fn build_request(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> RequestBuilder {
        let mut builder = self.inner.request(method, url).timeout(self.timeout);
        if let Some(b) = body {
            builder = builder.json(b);
        }
        self.apply_headers(builder)
    }

    /// Execute a request with exponential backoff retry.
    async fn request_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> WcResult<Response> {
        let url = self.url(path);
        debug!("{} {}", method, path);

        let mut last_error: Option<WcError> = None;

        for attempt in 0..=self.retry_config.max_retries {
            if attempt > 0 {
                let delay = self.calculate_retry_delay(attempt - 1);
                warn!(
                    "retrying {} {} (attempt {}/{}) after {:.1}s",
                    method,
                    path,
                    attempt + 1,
                    self.retry_config.max_retries + 1,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
            }

            let builder = self.build_request(method.clone(), &url, body);

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();

                    if self
                        .retry_config
                        .retryable_statuses
                        .contains(&status.as_u16())
                        && attempt < self.retry_config.max_retries
                    {
                        warn!("retryable status {} from {}", status.as_u16(), path);
                        last_error = Some(WcError::ServerError {
                            status: status.as_u16(),
                            message: format!("retryable status {status}"),
                        });
                        continue;
                    }

                    return Self::check_status(response).await;
                }
                Err(e) => {
                    let is_retryable = e.is_timeout() || e.is_connect();
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

        Err(last_error.unwrap_or_else(|| WcError::Http("max retries exceeded".into())))
    }

    /// Calculate retry delay with exponential backoff.
    fn calculate_retry_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.retry_config.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(1u64 << attempt.min(32));
        let max_ms = self.retry_config.max_delay.as_millis() as u64;
        Duration::from_millis(delay_ms.min(max_ms))
    }

    // --- Public HTTP methods ---

    /// Execute a GET request with automatic retry.
    pub async fn get(&self, path: &str) -> WcResult<Response> {
        self.request_with_retry(Method::GET, path, None).await
    }

    /// Execute a POST request with a JSON body.
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> WcResult<Response> {
        self.request_with_retry(Method::POST, path, Some(body)).await
    }

    // --- Response helpers ---

    /// Ping the backend. Returns the round-trip latency.
    pub async fn health_check(&self) -> WcResult<Duration> {
        let start = std::time::Instant::now();
        let resp: ServerResponse = self.get_json("/ping").await?;
        if resp.is_success() {
            Ok(start.elapsed())
        } else {
            Err(WcError::Http("health check failed".into()))
        }
    }

    /// Deserialize a response body into a ServerResponse<T>.
    pub async fn parse_response<T: DeserializeOwned>(
        response: Response,
    ) -> WcResult<ServerResponse<T>> {
        response
            .json::<ServerResponse<T>>()
            .await
            .map_err(|e| WcError::Serialization(format!("failed to parse response: {e}")))
    }

    /// Convenience: GET + parse into ServerResponse<T>.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> WcResult<ServerResponse<T>> {
        let resp = self.get(path).await?;
        Self::parse_response(resp).await
    }

    /// Convenience: POST + parse into ServerResponse<T>.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> WcResult<ServerResponse<T>> {
        let resp = self.post(path, body).await?;
        Self::parse_response(resp).await
    }

    /// Check the HTTP status code and convert to WcError if needed.
    ///
    /// 4xx other than 401/403 pass through so endpoints can interpret them
    /// (the validation endpoint maps 400 to a bad-request outcome).
    async fn check_status(response: Response) -> WcResult<Response> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(WcError::AuthFailed(format!("backend returned {status}")));
        }

        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(WcError::ServerError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response)
    }

    /// Classify a reqwest error into a WcError variant.
    fn classify_error(e: reqwest::Error) -> WcError {
        if e.is_timeout() {
            WcError::Timeout(e.to_string())
        } else if e.is_connect() {
            WcError::Http(format!("connection failed: {e}"))
        } else {
            WcError::Http(e.to_string())
        }
    }
}

/// Derive the origin (scheme + host + optional port) from a backend address.
fn derive_origin(address: &str) -> String {
    if let Ok(url) = reqwest::Url::parse(address) {
        let host = url.host_str().unwrap_or("localhost");
        match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        }
    } else {
        address.to_string()
    }
}
