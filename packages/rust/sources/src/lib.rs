//! Feed sources: provider type → fetch strategy.
//!
//! A [`SourceRegistry`] owns the HTTP transport and a table of
//! [`SourceStrategy`] values keyed by provider type. `fetch` looks the
//! provider's type up, downloads `source_url`, and hands the document to the
//! strategy's parser. Strategies that understand index documents (sitemap
//! indexes) get their nested documents followed up to [`MAX_INDEX_DEPTH`].

mod rss;
mod sitemap;
pub mod transport;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use feedrelay_shared::{FeedRelayError, Item, ProviderConfig, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};

/// How many levels of nested index documents are followed.
pub const MAX_INDEX_DEPTH: usize = 3;

/// Provider type for Google News / XML sitemaps.
pub const PROVIDER_TYPE_GOOGLE_NEWS: &str = "google-news";
/// Provider type for RSS 2.0 feeds.
pub const PROVIDER_TYPE_RSS: &str = "rss";

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Output of a strategy parser for one document.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    /// Items found in the document, in document order.
    pub items: Vec<Item>,
    /// Nested documents to follow when `items` is empty.
    pub nested: Vec<String>,
}

/// Parses a response body into items, stamping each with the provider id.
pub type ParseFn = fn(body: &str, source_id: &str) -> Result<ParsedFeed>;

/// A fetch strategy: how to read one provider type's documents.
#[derive(Debug, Clone, Copy)]
pub struct SourceStrategy {
    /// Human-readable strategy name, used in logs.
    pub name: &'static str,
    pub parse: ParseFn,
    /// Follow [`ParsedFeed::nested`] links.
    pub follow_index: bool,
}

impl SourceStrategy {
    /// Google News and standard XML sitemaps, following sitemap indexes.
    pub fn google_news() -> Self {
        Self {
            name: PROVIDER_TYPE_GOOGLE_NEWS,
            parse: sitemap::parse,
            follow_index: true,
        }
    }

    /// RSS 2.0 `channel/item` feeds.
    pub fn rss() -> Self {
        Self {
            name: PROVIDER_TYPE_RSS,
            parse: rss::parse,
            follow_index: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Lookup table from provider type to [`SourceStrategy`].
pub struct SourceRegistry {
    transport: Arc<dyn HttpTransport>,
    strategies: HashMap<String, SourceStrategy>,
}

impl SourceRegistry {
    /// An empty registry; register strategies with [`SourceRegistry::register`].
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            strategies: HashMap::new(),
        }
    }

    /// Registry with the built-in strategies:
    /// `google-news` (also `google_news`, `sitemap`) and `rss`.
    pub fn with_defaults(transport: Arc<dyn HttpTransport>) -> Self {
        let mut registry = Self::new(transport);
        let news = SourceStrategy::google_news();
        registry.register(PROVIDER_TYPE_GOOGLE_NEWS, news);
        registry.register("google_news", news);
        registry.register("sitemap", news);
        registry.register(PROVIDER_TYPE_RSS, SourceStrategy::rss());
        registry
    }

    /// Add or replace the strategy for `provider_type` (case-insensitive).
    pub fn register(&mut self, provider_type: &str, strategy: SourceStrategy) {
        self.strategies
            .insert(provider_type.trim().to_ascii_lowercase(), strategy);
    }

    pub fn supports(&self, provider_type: &str) -> bool {
        self.lookup(provider_type).is_some()
    }

    /// Registered provider types, sorted.
    pub fn provider_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// The transport shared with the enrichment engine.
    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.transport)
    }

    fn lookup(&self, provider_type: &str) -> Option<&SourceStrategy> {
        self.strategies
            .get(&provider_type.trim().to_ascii_lowercase())
    }

    /// Fetch one provider's items.
    ///
    /// Fails with `UnsupportedProviderType` for an unknown type,
    /// `InvalidProviderConfig` for an empty `source_url`, `Cancelled` when
    /// `cancel` fires, and `SourceFetchFailed` when nothing usable came back.
    #[instrument(skip_all, fields(provider = %provider.id, provider_type = %provider.kind))]
    pub async fn fetch(
        &self,
        provider: &ProviderConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<Item>> {
        let strategy = *self.lookup(&provider.kind).ok_or_else(|| {
            FeedRelayError::UnsupportedProviderType {
                provider_type: provider.kind.clone(),
            }
        })?;

        let source_url = provider.source_url.trim();
        if source_url.is_empty() {
            return Err(FeedRelayError::InvalidProviderConfig {
                provider: provider.id.clone(),
                message: "source_url is empty".into(),
            });
        }

        let root = self.fetch_document(provider, strategy, source_url, cancel).await?;

        let mut items = root.items;
        if items.is_empty() && strategy.follow_index && !root.nested.is_empty() {
            items = self
                .follow_index(provider, strategy, source_url, root.nested, cancel)
                .await?;
        }

        if items.is_empty() {
            return Err(FeedRelayError::fetch_failed(&provider.id, "no records"));
        }

        info!(strategy = strategy.name, items = items.len(), "provider fetched");
        Ok(items)
    }

    /// Breadth-first walk of nested index documents. Each URL is fetched at
    /// most once. Any nested failure fails the whole fetch, so a partial
    /// index never reaches the sinks.
    async fn follow_index(
        &self,
        provider: &ProviderConfig,
        strategy: SourceStrategy,
        root_url: &str,
        nested: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Item>> {
        let mut visited: HashSet<String> = HashSet::from([root_url.to_string()]);
        let mut queue: VecDeque<(String, usize)> =
            nested.into_iter().map(|url| (url, 1)).collect();
        let mut items = Vec::new();

        while let Some((url, depth)) = queue.pop_front() {
            if depth > MAX_INDEX_DEPTH {
                debug!(%url, depth, "index depth limit reached");
                continue;
            }
            if !visited.insert(url.clone()) {
                debug!(%url, "index already visited");
                continue;
            }

            pace(provider.request_delay(), cancel).await?;

            let doc = self
                .fetch_document(provider, strategy, &url, cancel)
                .await
                .inspect_err(|e| warn!(%url, depth, error = %e, "nested document failed"))?;

            if doc.items.is_empty() {
                queue.extend(doc.nested.into_iter().map(|u| (u, depth + 1)));
            } else {
                items.extend(doc.items);
            }
        }

        Ok(items)
    }

    async fn fetch_document(
        &self,
        provider: &ProviderConfig,
        strategy: SourceStrategy,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ParsedFeed> {
        debug!(%url, "fetching document");
        let response = self
            .transport
            .get(url, &provider.headers, cancel)
            .await
            .map_err(|e| match e {
                FeedRelayError::Cancelled => e,
                other => FeedRelayError::fetch_failed(&provider.id, other.to_string()),
            })?;

        if !response.is_success() {
            return Err(FeedRelayError::fetch_failed(
                &provider.id,
                format!("{url}: HTTP {}", response.status),
            ));
        }

        let body = response.text_lossy();
        (strategy.parse)(&body, &provider.id)
            .map_err(|e| FeedRelayError::fetch_failed(&provider.id, format!("{url}: {e}")))
    }
}

/// Wait out the provider's request delay, or bail on cancellation.
async fn pace(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    if delay.is_zero() {
        return if cancel.is_cancelled() {
            Err(FeedRelayError::Cancelled)
        } else {
            Ok(())
        };
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(FeedRelayError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
