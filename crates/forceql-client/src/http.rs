//! Core HTTP client with retry and CRM-specific error handling.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{RequestBody, RequestSpec};
use crate::retry::RetryPolicy;

/// HTTP client with built-in retry and error handling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: ClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent);

        if config.accept_compressed {
            builder = builder.gzip(true).deflate(true);
        } else {
            builder = builder.gzip(false).deflate(false);
        }

        let inner = builder
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        Ok(Self { inner, config })
    }

    /// Create a new HTTP client with default configuration.
    pub fn default_client() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute a request with automatic retry handling.
    ///
    /// Non-2xx responses are turned into typed errors; retryable failures
    /// (timeouts, connection errors, 429/5xx) are retried per the configured
    /// policy.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn execute(&self, request: RequestSpec) -> Result<Response> {
        let mut retry_policy = self
            .config
            .retry
            .as_ref()
            .map(|c| RetryPolicy::new(c.clone()));

        loop {
            let result = self.execute_once(&request).await;

            match result {
                Ok(response) => {
                    return response.into_checked().await;
                }
                Err(err) if err.is_retryable() => {
                    if let Some(ref mut policy) = retry_policy {
                        if let Some(delay) = policy.next_delay(err.retry_after()) {
                            warn!(
                                attempt = policy.attempt(),
                                delay_ms = delay.as_millis(),
                                error = %err,
                                "Request failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }

                        return Err(Error::new(ErrorKind::RetriesExhausted {
                            attempts: policy.attempt(),
                        }));
                    }

                    return Err(err);
                }
                Err(err) => {
                    return Err(err);
                }
            }
        }
    }

    /// Execute a single request without retry logic.
    async fn execute_once(&self, request: &RequestSpec) -> Result<Response> {
        let mut req = self.inner.request(request.method.clone(), &request.url);

        if let Some(ref token) = request.bearer_token {
            req = req.bearer_auth(token);
        }

        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if !request.query_params.is_empty() {
            req = req.query(&request.query_params);
        }

        if let Some(ref body) = request.body {
            req = match body {
                RequestBody::Json(value) => req.json(value),
                RequestBody::Form(data) => req.form(data),
            };
        }

        if self.config.enable_tracing {
            debug!(method = %request.method, url = %request.url, "Sending request");
        }

        let response = req.send().await?;
        let status = response.status().as_u16();

        if self.config.enable_tracing {
            debug!(status, "Response received");
        }

        // Rate limiting carries an optional Retry-After hint for the policy.
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);

            return Err(Error::new(ErrorKind::RateLimited { retry_after }));
        }

        // Retryable server errors
        if matches!(status, 500 | 502 | 503 | 504) {
            return Err(Error::new(ErrorKind::Http {
                status,
                message: format!("Server error: {}", status),
            }));
        }

        Ok(Response::new(response))
    }

    /// Execute a request and deserialize the JSON response.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestSpec) -> Result<T> {
        let response = self.execute(request).await?;
        response.json().await
    }

    /// Execute a request expecting an empty (204) success response.
    pub async fn send_no_content(&self, request: RequestSpec) -> Result<()> {
        let response = self.execute(request).await?;
        if response.status() == 204 || response.is_success() {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::Http {
                status: response.status(),
                message: "Unexpected response".to_string(),
            }))
        }
    }
}

/// Wrapper around an HTTP response.
#[derive(Debug)]
pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Returns true if the response status is successful (2xx).
    pub fn is_success(&self) -> bool {
        self.inner.status().is_success()
    }

    /// Get the response body as text.
    pub async fn text(self) -> Result<String> {
        self.inner.text().await.map_err(Into::into)
    }

    /// Deserialize the response body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        self.inner.json().await.map_err(Into::into)
    }

    /// Check for API errors and convert non-success responses.
    async fn into_checked(self) -> Result<Response> {
        if self.is_success() {
            return Ok(self);
        }

        let status = self.status();
        let body = self.text().await.unwrap_or_default();
        Err(parse_error_response(status, &body))
    }
}

/// Error entry in a CRM error response body.
#[derive(Debug, Deserialize)]
struct ApiErrorEntry {
    #[serde(rename = "errorCode", alias = "error_code")]
    error_code: String,
    message: String,
    #[serde(default)]
    fields: Option<Vec<String>>,
}

/// Parse an error response body into the appropriate error kind.
///
/// The service reports errors as a JSON array of `{message, errorCode}`
/// objects; authorization failures (401) are classified separately so the
/// session layer can react to them.
fn parse_error_response(status: u16, body: &str) -> Error {
    let api_error = serde_json::from_str::<Vec<ApiErrorEntry>>(body)
        .ok()
        .and_then(|errors| errors.into_iter().next())
        .or_else(|| serde_json::from_str::<ApiErrorEntry>(body).ok());

    if status == 401 {
        let message = api_error
            .map(|e| format!("{}: {}", e.error_code, e.message))
            .unwrap_or_else(|| truncated(body));
        return Error::new(ErrorKind::Unauthorized(message));
    }

    if let Some(err) = api_error {
        return Error::new(ErrorKind::Api {
            error_code: err.error_code,
            message: err.message,
            fields: err.fields.unwrap_or_default(),
        });
    }

    let message = truncated(body);
    let kind = match status {
        403 => ErrorKind::Forbidden(message),
        404 => ErrorKind::NotFound(message),
        _ => ErrorKind::Http { status, message },
    };

    Error::new(kind)
}

fn truncated(body: &str) -> String {
    const MAX_LENGTH: usize = 500;
    if body.len() > MAX_LENGTH {
        let mut end = MAX_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
