//! reqwest-backed transport.

use crate::config::HttpConfig;
use crate::error::{HttpError, HttpResult};
use async_trait::async_trait;
use cytomine_core::{Method, Request, Transport, TransportError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// Longest slice of a raw error body kept as a message.
const MAX_MESSAGE_LEN: usize = 200;

/// HTTP transport for a Cytomine service.
///
/// Bodies are JSON in both directions. Non-success statuses become
/// [`TransportError::Status`] with the service's message when it sent one.
pub struct HttpTransport {
    config: HttpConfig,
    client: Client,
    closed: AtomicBool,
}

impl HttpTransport {
    /// Creates a transport from `config`.
    pub fn new(config: HttpConfig) -> HttpResult<Self> {
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(HttpError::InvalidUrl(config.base_url));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| HttpError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| HttpError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            config,
            client,
            closed: AtomicBool::new(false),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Returns true once the transport has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> Result<Value, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let url = self.config.url_for(&request.path);
        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        let builder = builder
            .header("Accept", "application/json")
            .query(&request.query);
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        debug!(method = %request.method, %url, status = status.as_u16(), "response");
        trace!(body = %text, "response body");

        if !status.is_success() {
            let message = error_message(&text)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_default();
            return Err(TransportError::status(status.as_u16(), message));
        }

        parse_body(&text)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Parses a success body; an empty body is `null`.
fn parse_body(text: &str) -> Result<Value, TransportError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Extracts the service's error message from a failure body.
fn error_message(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        let from_errors = match map.get("errors") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(inner)) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        };
        if let Some(message) = from_errors.or_else(|| {
            map.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        }) {
            return Some(message);
        }
    }

    Some(trimmed.chars().take(MAX_MESSAGE_LEN).collect())
}
