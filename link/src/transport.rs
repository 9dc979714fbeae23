//! HTTP transport behind the statement engine.
//!
//! The engine only needs `send(request) -> response`; [`HttpTransport`]
//! implements it with reqwest. Tests plug in their own [`Transport`].

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value as JsonValue;
use std::time::Instant;
use thiserror::Error;

use crate::error::{LinkError, Result};
use crate::statement::Method;
use crate::timeouts::LinkTimeouts;

/// One HTTP exchange, fully resolved
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<JsonValue>,
}

impl TransportRequest {
    /// First value of a header, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status, decoded body and headers of a response. A body that is not JSON
/// is kept as a JSON string; an empty body is `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: JsonValue,
    pub headers: Vec<(String, String)>,
}

impl TransportResponse {
    pub fn new(status: u16, body: JsonValue) -> Self {
        Self {
            status,
            body,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Every value of a header, compared case-insensitively
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Transport-level failure
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// The service answered with an error status and this body
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// No response could be obtained (connect, timeout, TLS, ...)
    #[error("{0}")]
    Unreachable(String),
}

impl From<TransportError> for LinkError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { status, body } => LinkError::Execution {
                status: Some(status),
                message: body,
            },
            TransportError::Unreachable(reason) => {
                LinkError::execution(format!("service unreachable: {}", reason))
            }
        }
    }
}

/// Sends resolved requests to the remote service.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> std::result::Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport. No retries: statements may have side effects.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeouts: &LinkTimeouts) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(timeouts.connection_timeout)
            // keep-alive for repeated statements against one site
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(std::time::Duration::from_secs(90));
        if !LinkTimeouts::is_no_timeout(timeouts.request_timeout) {
            builder = builder.timeout(timeouts.request_timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| LinkError::Configuration(e.to_string()))?;
        Ok(Self { http_client })
    }

    pub fn from_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    fn reqwest_method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> std::result::Result<TransportResponse, TransportError> {
        let mut req_builder = self
            .http_client
            .request(Self::reqwest_method(request.method), &request.url);
        if !request.query.is_empty() {
            req_builder = req_builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            req_builder = req_builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            req_builder = req_builder.json(body);
        }

        let start = Instant::now();
        debug!("[SITE_HTTP] Sending {} to {}", request.method, request.url);

        let response = req_builder.send().await.map_err(|e| {
            warn!(
                "[SITE_HTTP] Fatal error: {} duration_ms={}",
                e,
                start.elapsed().as_millis()
            );
            TransportError::Unreachable(e.to_string())
        })?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Unreachable(format!("failed to read response body: {}", e)))?;
        let duration_ms = start.elapsed().as_millis();

        if status >= 400 {
            warn!(
                "[SITE_HTTP] Server error: status={} body=\"{}\" duration_ms={}",
                status, text, duration_ms
            );
            return Err(TransportError::Status { status, body: text });
        }
        debug!(
            "[SITE_HTTP] Response received: status={} duration_ms={}",
            status, duration_ms
        );

        let body = if text.trim().is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_str(&text).unwrap_or(JsonValue::String(text))
        };
        Ok(TransportResponse {
            status,
            body,
            headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transport_error_mapping() {
        let err: LinkError = TransportError::Status {
            status: 409,
            body: "{\"message\":\"duplicate\"}".into(),
        }
        .into();
        assert_eq!(err.status_code(), Some(409));
        assert!(err.to_string().contains("duplicate"));

        let err: LinkError = TransportError::Unreachable("connection refused".into()).into();
        assert_eq!(err.status_code(), None);
        assert_eq!(
            err.to_string(),
            "Execution failed: service unreachable: connection refused"
        );
    }

    #[test]
    fn test_response_headers() {
        let response = TransportResponse::new(200, json!({}))
            .with_header("Set-Cookie", "a=1; Path=/")
            .with_header("set-cookie", "b=2; HttpOnly");
        assert_eq!(response.header_values("SET-COOKIE"), vec!["a=1; Path=/", "b=2; HttpOnly"]);
        assert!(response.is_success());
        assert!(!TransportResponse::new(302, JsonValue::Null).is_success());
    }

    #[test]
    fn test_http_transport_builds() {
        assert!(HttpTransport::new(&LinkTimeouts::default()).is_ok());
    }
}
