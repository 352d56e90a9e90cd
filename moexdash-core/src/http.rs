//! Upstream HTTP access.
//!
//! One attempt per request: connection errors, timeouts and non-2xx statuses
//! all surface as errors for the calling updater. There is no retry layer.

use crate::error::{SyncError, SyncResult};
use std::time::Duration;

/// A plain GET against an upstream API.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub timeout: Duration,
    pub user_agent: Option<String>,
    /// Fallback charset when the response does not declare one.
    pub charset: Option<&'static str>,
}

impl Request {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            user_agent: None,
            charset: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_charset(mut self, charset: &'static str) -> Self {
        self.charset = Some(charset);
        self
    }
}

pub trait Transport: Send + Sync {
    fn get_json(&self, request: &Request) -> SyncResult<serde_json::Value>;

    fn get_text(&self, request: &Request) -> SyncResult<String>;
}

/// Blocking `reqwest` transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> SyncResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn send(&self, request: &Request) -> SyncResult<reqwest::blocking::Response> {
        let mut builder = self.client.get(&request.url).timeout(request.timeout);
        if let Some(ua) = &request.user_agent {
            builder = builder.header(reqwest::header::USER_AGENT, ua);
        }

        tracing::debug!(url = %request.url, "GET");
        let resp = builder
            .send()
            .map_err(|e| SyncError::network(&request.url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, request: &Request) -> SyncResult<serde_json::Value> {
        self.send(request)?.json().map_err(|e| {
            SyncError::ResponseFormat(format!("invalid JSON from {}: {e}", request.url))
        })
    }

    fn get_text(&self, request: &Request) -> SyncResult<String> {
        let resp = self.send(request)?;
        let body = match request.charset {
            Some(charset) => resp.text_with_charset(charset),
            None => resp.text(),
        };
        body.map_err(|e| SyncError::network(&request.url, e))
    }
}
