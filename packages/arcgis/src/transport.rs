//! The "GET a URL, decode JSON" seam.
//!
//! [`HttpTransport`] is the production implementation backed by
//! `reqwest`. [`StaticTransport`] serves canned documents keyed by exact
//! URL and records every request it sees.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::ArcGisError;

/// Fetches a URL and decodes the body as JSON.
///
/// Implementations make exactly one attempt per call; nothing is retried.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a GET request and decodes the response body.
    ///
    /// # Errors
    ///
    /// Returns [`ArcGisError::Timeout`] or [`ArcGisError::Transport`] if
    /// the request fails, [`ArcGisError::HttpStatus`] for any status other
    /// than 200, and [`ArcGisError::Decode`] for a malformed body.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, ArcGisError>;
}

/// `reqwest`-backed transport with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ArcGisError::Transport`] if the HTTP client cannot be
    /// constructed (e.g. the TLS backend fails to initialize).
    pub fn new(timeout: Duration) -> Result<Self, ArcGisError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("arcgis-export/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ArcGisError::Transport {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

fn request_error(url: &str, e: &reqwest::Error) -> ArcGisError {
    if e.is_timeout() {
        ArcGisError::Timeout {
            url: url.to_string(),
        }
    } else {
        ArcGisError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, ArcGisError> {
        log::debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, &e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ArcGisError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| request_error(url, &e))?;

        serde_json::from_str(&body).map_err(|source| ArcGisError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// In-memory transport serving canned JSON documents.
///
/// Unknown URLs answer with HTTP 404.
#[derive(Debug, Clone, Default)]
pub struct StaticTransport {
    responses: BTreeMap<String, serde_json::Value>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StaticTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a canned response for `url`, replacing any previous one.
    #[must_use]
    pub fn with(mut self, url: impl Into<String>, body: serde_json::Value) -> Self {
        self.responses.insert(url.into(), body);
        self
    }

    /// Returns every URL requested so far, in request order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, ArcGisError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| ArcGisError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_transport_serves_and_records() {
        let transport = StaticTransport::new()
            .with("https://h/a?f=json", serde_json::json!({"name": "A"}));

        let body = transport.get_json("https://h/a?f=json").await.unwrap();
        assert_eq!(body["name"], "A");

        let missing = transport.get_json("https://h/b?f=json").await;
        assert!(matches!(
            missing,
            Err(ArcGisError::HttpStatus { status: 404, .. })
        ));

        assert_eq!(
            transport.requests(),
            vec!["https://h/a?f=json".to_string(), "https://h/b?f=json".to_string()]
        );
    }

    #[test]
    fn builds_http_transport() {
        assert!(HttpTransport::new(Duration::from_secs(5)).is_ok());
    }
}
