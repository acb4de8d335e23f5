//! HTTP backend abstraction for the conversion API.
//!
//! `ApiClient` talks to the network only through [`HttpBackend`], so tests
//! can substitute a mock and the health checker in the runtime can reuse
//! the same transport with a shorter per-request timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use thiserror::Error;

use crate::config::ApiClientConfig;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail}")]
pub struct SendError {
    pub detail: String,
    /// True when the failure was the request timeout firing.
    pub timed_out: bool,
}

impl SendError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            timed_out: false,
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            timed_out: true,
        }
    }
}

impl From<reqwest::Error> for SendError {
    fn from(e: reqwest::Error) -> Self {
        Self {
            detail: e.to_string(),
            timed_out: e.is_timeout(),
        }
    }
}

/// Transport used by [`ApiClient`](crate::ApiClient).
///
/// Each call performs exactly one request. Non-2xx statuses are returned as
/// `Ok`; classifying them is the caller's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// GET `url`. `timeout` overrides the backend's default when set.
    async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<RawResponse, SendError>;

    /// POST `body` as JSON to `url`. `None` sends an empty body.
    async fn post_json(
        &self,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<RawResponse, SendError>;
}

/// Production HTTP backend using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    /// Create a backend with the config's timeout and user agent.
    pub fn new(config: &ApiClientConfig) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    async fn finish(request: reqwest::RequestBuilder) -> Result<RawResponse, SendError> {
        let response = request.header(ACCEPT, "application/json").send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(RawResponse::new(status, body.to_vec()))
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<RawResponse, SendError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        Self::finish(request).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<RawResponse, SendError> {
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json");
        let request = match body {
            Some(body) => request.json(&body),
            None => request.body(Vec::new()),
        };
        Self::finish(request).await
    }
}
