//! HTTP transport seam.
//!
//! Strategies describe requests as plain data and hand them to an
//! [`HttpTransport`]; the production implementation wraps one shared
//! `reqwest::Client`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Other(String),
}

/// Request body variants used by the analysis strategies.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// `application/json; charset=utf-8`.
    Json(serde_json::Value),
    /// `multipart/form-data` with a single file part.
    Multipart {
        field: String,
        file_name: String,
        mime: String,
        data: Bytes,
    },
    /// Raw bytes with an explicit content type.
    Raw { content_type: String, data: Bytes },
}

/// A single POST request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Json(body),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one request and returns whatever the server answered.
///
/// Non-2xx statuses are responses, not errors; only failures to complete the
/// exchange are reported as [`TransportError`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport backed by a single `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| TransportError::InvalidRequest(format!("{}: {e}", request.url)))?;

        let mut builder = self.client.post(url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &request.body {
            RequestBody::Json(value) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/json; charset=utf-8")
                .body(value.to_string()),
            RequestBody::Multipart {
                field,
                file_name,
                mime,
                data,
            } => {
                let part = multipart::Part::bytes(data.to_vec())
                    .file_name(file_name.clone())
                    .mime_str(mime)
                    .map_err(|e| TransportError::InvalidRequest(format!("bad mime {mime}: {e}")))?;
                builder.multipart(multipart::Form::new().part(field.clone(), part))
            }
            RequestBody::Raw { content_type, data } => builder
                .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
        };

        let resp = builder.send().await.map_err(map_reqwest_error)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(map_reqwest_error)?;
        Ok(HttpResponse { status, body })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_builder() {
        TransportError::InvalidRequest(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}
