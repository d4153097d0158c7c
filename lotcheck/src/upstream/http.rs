//! HTTP client abstraction for testability

use super::error::TransportError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Status and body of a completed HTTP exchange.
///
/// Non-2xx statuses are not errors at this layer: the upstream reports
/// business failures in the body of error responses, so the caller decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Creates a response with the given status and body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for asynchronous HTTP client operations.
///
/// Allows the engine to be exercised against scripted clients in tests.
pub trait AsyncHttpClient: Send + Sync + 'static {
    /// Performs an async HTTP POST with a JSON body.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    /// * `json_body` - JSON body as a string
    /// * `bearer_token` - Optional token for the `Authorization` header
    /// * `timeout` - Timeout for this request only
    fn post_json(
        &self,
        url: &str,
        json_body: &str,
        bearer_token: Option<&str>,
        timeout: Duration,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// Real HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

const DEFAULT_USER_AGENT: &str = concat!("lotcheck/", env!("CARGO_PKG_VERSION"));

impl ReqwestClient {
    /// Creates a new client with a shared connection pool.
    ///
    /// Timeouts are applied per request, since the primary and escalation
    /// paths use different limits.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn post_json(
        &self,
        url: &str,
        json_body: &str,
        bearer_token: Option<&str>,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        trace!(url = url, bytes = json_body.len(), "HTTP POST request starting");

        let mut request = self
            .client
            .post(url)
            .timeout(timeout)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(json_body.to_string());

        if let Some(token) = bearer_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = match request.send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(classify(e));
            }
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => {
                trace!(
                    url = url,
                    status = status,
                    bytes = body.len(),
                    "HTTP response body read"
                );
                Ok(HttpResponse { status, body })
            }
            Err(e) => {
                warn!(url = url, error = %e, "Failed to read response body");
                Err(classify(e))
            }
        }
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Other(e.to_string())
    }
}
