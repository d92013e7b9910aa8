//! Wire transport.
//!
//! The client core talks to the [`Transport`] trait only; the bundled
//! [`HttpTransport`] implementation drives a shared `reqwest` client with
//! rustls. The TLS-capable client is built exactly once, inside
//! [`HttpContext`], and passed to whichever component issues remote calls.

use crate::error::{ApiError, Result};
use crate::request::ApiRequest;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Response to an [`ApiRequest`].
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Executes a prepared request and returns the response.
///
/// Implementations must be safe to share across tasks; execution is
/// dispatched from spawned transaction tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// One-time-initialized HTTP/TLS context.
///
/// Wraps the shared `reqwest::Client`. Built once at application start
/// and handed to every transport that needs it; there is no implicit
/// process-global state.
#[derive(Debug, Clone)]
pub struct HttpContext {
    client: reqwest::Client,
}

impl HttpContext {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(HttpContext { client })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

/// [`Transport`] implementation over the shared HTTP context.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    context: Arc<HttpContext>,
}

impl HttpTransport {
    pub fn new(context: Arc<HttpContext>) -> Self {
        HttpTransport { context }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| ApiError::InvalidRequest(format!("bad method: {}", request.method)))?;

        let mut builder = self.context.client.request(method, &request.uri);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response.text().await?;

        tracing::debug!(status, "response received");
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_covers_the_2xx_range() {
        let mut response = ApiResponse {
            status: 200,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: String::new(),
        };
        assert!(response.is_success());
        assert_eq!(response.header("content-type"), Some("application/json"));

        response.status = 404;
        assert!(!response.is_success());
    }
}
