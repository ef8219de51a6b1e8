//! HTTP webhook sink.

use std::time::Duration;

use async_trait::async_trait;
use feedrelay_shared::{Event, FeedRelayError, HttpSinkConfig, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use tracing::debug;

use crate::Sink;

/// Sends each event as a JSON body to a fixed URL.
#[derive(Debug)]
pub struct HttpSink {
    id: String,
    url: String,
    method: Method,
    client: Client,
}

impl HttpSink {
    /// Validate the method and headers and build a client with the sink's
    /// timeout. Bad values are construction errors, not delivery errors.
    pub fn new(id: &str, config: &HttpSinkConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(FeedRelayError::sink_build(id, "http.url is empty"));
        }

        let method = Method::from_bytes(config.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|e| FeedRelayError::sink_build(id, format!("invalid method {:?}: {e}", config.method)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FeedRelayError::sink_build(id, format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| FeedRelayError::sink_build(id, format!("invalid value for header {name}: {e}")))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .map_err(|e| FeedRelayError::sink_build(id, format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            id: id.to_string(),
            url: config.url.trim().to_string(),
            method,
            client,
        })
    }
}

#[async_trait]
impl Sink for HttpSink {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        feedrelay_shared::config::SINK_TYPE_HTTP
    }

    async fn publish(&self, event: &Event) -> Result<()> {
        let response = self
            .client
            .request(self.method.clone(), &self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| FeedRelayError::delivery(&self.id, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedRelayError::delivery(&self.id, format!("HTTP {status}")));
        }
        debug!(sink = %self.id, event = %event.id, %status, "event delivered");
        Ok(())
    }
}
