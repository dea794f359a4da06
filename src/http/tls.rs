// ABOUTME: reqwest-based client with rustls, for endpoints outside the local network.
// ABOUTME: Webhooks go through it so https receivers work; plain http is accepted too.

use super::{HttpClient, HttpError, HttpRequest, HttpResponse, Method};
use async_trait::async_trait;
use std::time::Instant;

const USER_AGENT: &str = concat!("cutover/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct TlsClient {
    client: reqwest::Client,
}

impl TlsClient {
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .use_rustls_tls()
            .build()
            .map_err(|e| HttpError::Request(format!("failed to build TLS client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for TlsClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", request.url, e)))?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(HttpError::UnsupportedScheme(other.to_string())),
        }

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self
            .client
            .request(method, url)
            .timeout(request.timeout);
        if let Some(content_type) = request.content_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let start = Instant::now();
        let resp = builder
            .send()
            .await
            .map_err(|e| classify(e, request.timeout))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| classify(e, request.timeout))?;

        tracing::debug!("{} {} -> {} in {:?}", request.method, request.url, status, start.elapsed());

        Ok(HttpResponse {
            status,
            elapsed: start.elapsed(),
            body,
        })
    }
}

fn classify(e: reqwest::Error, timeout: std::time::Duration) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout(timeout)
    } else if e.is_connect() {
        HttpError::Connect(e.to_string())
    } else {
        HttpError::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn accepts_https_scheme() {
        let client = TlsClient::new().unwrap();
        // Nothing listens on port 1, so the https request reaches the connect step
        let err = client
            .send(HttpRequest::get("https://127.0.0.1:1/hook", Duration::from_secs(2)))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Connect(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn rejects_other_schemes() {
        let client = TlsClient::new().unwrap();
        let err = client
            .send(HttpRequest::get("ftp://example.com/hook", Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::UnsupportedScheme(s) if s == "ftp"));
    }
}
