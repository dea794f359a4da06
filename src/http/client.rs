// ABOUTME: Hyper-based HTTP/1.1 client over plain TCP.
// ABOUTME: One connection per request, bounded by the request's own timeout.

use super::{HttpClient, HttpError, HttpRequest, HttpResponse, Method};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use std::time::Instant;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

const USER_AGENT: &str = concat!("cutover/", env!("CARGO_PKG_VERSION"));

/// Plain-HTTP client. Health endpoints and the proxy live on the local
/// network, so TLS is out of scope here.
#[derive(Debug, Clone, Default)]
pub struct HyperClient;

impl HyperClient {
    pub fn new() -> Self {
        Self
    }
}

/// Aborts the connection driver when the request future is dropped,
/// so a timed-out or cancelled request leaves nothing running.
struct ConnectionGuard(JoinHandle<()>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[async_trait]
impl HttpClient for HyperClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let timeout = request.timeout;
        tokio::time::timeout(timeout, exchange(request))
            .await
            .map_err(|_| HttpError::Timeout(timeout))?
    }
}

async fn exchange(request: HttpRequest) -> Result<HttpResponse, HttpError> {
    let uri: hyper::Uri = request
        .url
        .parse()
        .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", request.url, e)))?;

    match uri.scheme_str() {
        Some("http") => {}
        Some(other) => return Err(HttpError::UnsupportedScheme(other.to_string())),
        None => return Err(HttpError::InvalidUrl(format!("{}: missing scheme", request.url))),
    }

    let authority = uri
        .authority()
        .ok_or_else(|| HttpError::InvalidUrl(format!("{}: missing host", request.url)))?
        .clone();
    let host = authority.host().to_string();
    let port = authority.port_u16().unwrap_or(80);
    let path = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let start = Instant::now();

    let stream = TcpStream::connect((host.as_str(), port))
        .await
        .map_err(|e| HttpError::Connect(format!("{}:{}: {}", host, port, e)))?;

    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| HttpError::Connect(format!("HTTP handshake failed: {}", e)))?;

    let _guard = ConnectionGuard(tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!("http connection error: {}", e);
        }
    }));

    let method = match request.method {
        Method::Get => hyper::Method::GET,
        Method::Head => hyper::Method::HEAD,
        Method::Post => hyper::Method::POST,
    };

    let mut builder = hyper::Request::builder()
        .method(method)
        .uri(&path)
        .header(hyper::header::HOST, authority.as_str())
        .header(hyper::header::USER_AGENT, USER_AGENT);
    if let Some(content_type) = request.content_type {
        builder = builder.header(hyper::header::CONTENT_TYPE, content_type);
    }

    let body = Full::new(request.body.unwrap_or_else(Bytes::new));
    let req = builder
        .body(body)
        .map_err(|e| HttpError::Request(format!("failed to build request: {}", e)))?;

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| HttpError::Request(e.to_string()))?;

    let status = resp.status().as_u16();
    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| HttpError::Request(format!("failed to read response: {}", e)))?
        .to_bytes();

    tracing::debug!("{} {} -> {} in {:?}", request.method, request.url, status, start.elapsed());

    Ok(HttpResponse {
        status,
        elapsed: start.elapsed(),
        body,
    })
}
