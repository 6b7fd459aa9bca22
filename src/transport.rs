//! HTTP transport
//!
//! The launcher talks to the server only through [`Transport`], so the
//! network call can be swapped for a fake in tests or embedded clients.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::core::{join_under, LaunchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
}

/// A request against the server, path relative to its base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: ApiMethod,
    pub path: String,
    pub bearer: Option<String>,
    /// JSON body, sent with `Content-Type: application/json`
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: ApiMethod::Get,
            path: path.into(),
            bearer: None,
            body: None,
        }
    }

    pub fn post_json(path: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: ApiMethod::Post,
            path: path.into(),
            bearer: None,
            body: Some(body),
        }
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Status line and raw body of a server response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Reason phrase, e.g. `Internal Server Error`
    pub reason: String,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Single network seam of the client
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. Non-success statuses are returned, not raised;
    /// only failures to get a response at all are errors.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, LaunchError>;
}

impl From<reqwest::Error> for LaunchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LaunchError::Transport("Request timed out".to_string())
        } else {
            LaunchError::Transport(e.to_string())
        }
    }
}

/// `reqwest`-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Requests wait indefinitely unless `timeout` is given
    pub fn new(base_url: Url, timeout: Option<Duration>) -> Result<Self, LaunchError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("streamexec/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, LaunchError> {
        let url = join_under(&self.base_url, &request.path)
            .map_err(|e| LaunchError::Transport(format!("Invalid request path {}: {}", request.path, e)))?;

        let mut builder = match request.method {
            ApiMethod::Get => self.client.get(url.clone()),
            ApiMethod::Post => self.client.post(url.clone()),
        }
        .header(ACCEPT, "application/json");

        if let Some(token) = &request.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        tracing::debug!("{:?} {}", request.method, url);
        let response = builder.send().await?;

        let status = response.status();
        let reason = status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.as_str().to_string());
        let body = response.bytes().await?.to_vec();

        tracing::debug!("{} {} ({} bytes)", status.as_u16(), reason, body.len());

        Ok(ApiResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}
