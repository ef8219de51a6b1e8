//! Outbound HTTP, shared by feed fetching and page enrichment.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use feedrelay_shared::{FeedRelayError, HttpConfig, Result};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Bodies beyond this many bytes are cut off (10 MB).
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// A completed HTTP exchange. Non-2xx statuses are data here, not errors.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// GET capability used by sources and the enrichment engine.
///
/// Implementations return `Err(FeedRelayError::Cancelled)` when `cancel` fires
/// before the response body is read, and `Err(FeedRelayError::Network)` for
/// transport failures.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse>;
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

/// [`HttpTransport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client with the configured user agent and request timeout.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FeedRelayError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(&self, url: &str, headers: &BTreeMap<String, String>) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| FeedRelayError::Network(format!("{url}: {e}")))?;
        let status = response.status().as_u16();

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FeedRelayError::Network(format!("{url}: failed to read body: {e}")))?
        {
            let room = MAX_RESPONSE_SIZE - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                debug!(%url, limit = MAX_RESPONSE_SIZE, "response body truncated");
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        if cancel.is_cancelled() {
            return Err(FeedRelayError::Cancelled);
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(FeedRelayError::Cancelled),
            result = self.send(url, headers) => result,
        }
    }
}
