//! HTTP plumbing for backend calls.
//!
//! Provides a shared pooled client so concurrent registrations and exports
//! reuse connections, plus a small JSON API client with error classification.

use once_cell::sync::Lazy;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Max idle connections kept per host.
pub(crate) const DEFAULT_POOL_SIZE: usize = 32;

/// Connection timeout in seconds.
pub(crate) const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Request timeout in seconds.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

static SHARED_CLIENT: Lazy<Client> = Lazy::new(|| build_pooled_client(None));

/// The process-wide pooled client used for registrations and exports.
pub(crate) fn shared_client() -> &'static Client {
    &SHARED_CLIENT
}

/// Build a pooled HTTP client.
pub fn build_pooled_client(timeout_secs: Option<u64>) -> Client {
    let timeout = Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

    Client::builder()
        .pool_max_idle_per_host(DEFAULT_POOL_SIZE)
        .pool_idle_timeout(Duration::from_secs(90))
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .timeout(timeout)
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// HTTP error details for a non-2xx response.
#[derive(Debug, Clone)]
pub struct HttpErrorDetail {
    pub status: u16,
    pub url: String,
    pub message: String,
    pub body_snippet: Option<String>,
}

impl std::fmt::Display for HttpErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {} for {}: {}", self.status, self.url, self.message)?;
        if let Some(ref snippet) = self.body_snippet {
            let truncated: String = snippet.chars().take(200).collect();
            write!(f, " | body[0:200]={}", truncated)?;
        }
        Ok(())
    }
}

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{0}")]
    Response(HttpErrorDetail),

    #[error("json parse error: {0}")]
    JsonParse(String),

    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
}

impl HttpError {
    /// Create an HTTP error from a response status and body.
    pub fn from_response(status: u16, url: &str, body: Option<&str>) -> Self {
        let body_snippet = body.map(|s| s.chars().take(4096).collect());
        HttpError::Response(HttpErrorDetail {
            status,
            url: url.to_string(),
            message: "request_failed".to_string(),
            body_snippet,
        })
    }

    /// Get the HTTP status code, if available.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Response(detail) => Some(detail.status),
            HttpError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// JSON API client bound to one backend endpoint.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    endpoint: String,
}

impl ApiClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: shared_client().clone(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn abs_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    /// POST a JSON body with extra headers and parse the JSON response.
    ///
    /// Non-2xx responses and transport errors map to [`HttpError`].
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
        headers: HeaderMap,
    ) -> Result<T, HttpError> {
        let url = self.abs_url(path);
        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        if !(200..300).contains(&status) {
            let text = String::from_utf8_lossy(&bytes);
            return Err(HttpError::from_response(
                status,
                &url,
                if text.trim().is_empty() { None } else { Some(&text) },
            ));
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            let text = String::from_utf8_lossy(&bytes);
            let snippet: String = text.chars().take(100).collect();
            HttpError::JsonParse(format!("{}: {}", e, snippet))
        })
    }
}
