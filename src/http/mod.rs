// ABOUTME: HTTP clients: plain hyper for probes and smoke tests, rustls-backed reqwest for webhooks.
// ABOUTME: Exposes a transport trait so components can run against test doubles.

mod client;
mod tls;

pub use client::HyperClient;
pub use tls::TlsClient;

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::time::Duration;

/// HTTP methods the orchestrator issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Head => write!(f, "HEAD"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A single request with its own deadline.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Bytes>,
    pub content_type: Option<&'static str>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
            content_type: None,
            timeout,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Vec<u8>, timeout: Duration) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(Bytes::from(body)),
            content_type: Some("application/json"),
            timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub elapsed: Duration,
    pub body: Bytes,
}

/// Errors from the HTTP transport. Any of these means "no usable response".
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("invalid URL {0}")]
    InvalidUrl(String),

    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Transport used by the prober, smoke runner, and webhook notifier.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) if !path.is_empty() => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("http://a:1", "/health"), "http://a:1/health");
        assert_eq!(join_url("http://a:1/", "/health"), "http://a:1/health");
        assert_eq!(join_url("http://a:1", "health"), "http://a:1/health");
        assert_eq!(join_url("http://a:1/", "health"), "http://a:1/health");
        assert_eq!(join_url("http://a:1", ""), "http://a:1");
    }

    #[test]
    fn post_json_sets_content_type() {
        let req = HttpRequest::post_json("http://x/hook", b"{}".to_vec(), Duration::from_secs(1));
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.content_type, Some("application/json"));
    }
}
