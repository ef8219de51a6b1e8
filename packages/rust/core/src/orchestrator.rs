//! One crawl cycle: FETCH → ENRICH → FILTER → PUBLISH → MARK_SEEN, per provider.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use feedrelay_crawler::Enricher;
use feedrelay_shared::{AppConfig, Event, Item, ProviderConfig};
use feedrelay_sinks::FanOut;
use feedrelay_sources::SourceRegistry;
use feedrelay_storage::SeenStore;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Cycle behaviour switches, normally taken from [`AppConfig`].
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorOptions {
    /// Fetch item pages and overlay their metadata.
    pub enrich: bool,
    /// Mark an item seen even when no sink accepted it.
    pub mark_on_delivery_failure: bool,
    /// Crawl providers concurrently.
    pub parallel_providers: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            enrich: true,
            mark_on_delivery_failure: true,
            parallel_providers: false,
        }
    }
}

impl From<&AppConfig> for OrchestratorOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            enrich: config.enrichment.enabled,
            mark_on_delivery_failure: config.dedupe.mark_on_delivery_failure,
            parallel_providers: config.service.parallel_providers,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// How a provider's cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderOutcome {
    /// Items were published (possibly zero after dedupe).
    Done,
    /// The fetch produced nothing usable; nothing was published.
    Failed,
    /// Cancellation arrived before the provider started.
    Skipped,
}

/// Counters for one provider in one cycle.
#[derive(Debug, Clone)]
pub struct ProviderReport {
    pub provider_id: String,
    pub outcome: ProviderOutcome,
    /// Fetch error, when `outcome` is `Failed`.
    pub error: Option<String>,
    pub fetched: usize,
    /// Items dropped as already seen or repeated within the batch.
    pub duplicates: usize,
    /// Events handed to fan-out.
    pub published: usize,
    /// Per-sink delivery failures, summed over events.
    pub delivery_failures: usize,
    pub marked: usize,
    /// Items left unpublished and unmarked because the cycle was cancelled.
    pub deferred: usize,
    /// Seen-store calls that failed and were treated as "not seen".
    pub store_errors: usize,
}

impl ProviderReport {
    fn new(provider_id: &str, outcome: ProviderOutcome) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            outcome,
            error: None,
            fetched: 0,
            duplicates: 0,
            published: 0,
            delivery_failures: 0,
            marked: 0,
            deferred: 0,
            store_errors: 0,
        }
    }
}

/// Result of [`Orchestrator::run_cycle`].
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub providers: Vec<ProviderReport>,
    pub elapsed: Duration,
    /// The cycle's token was cancelled by the time it finished.
    pub cancelled: bool,
}

impl CycleReport {
    pub fn published(&self) -> usize {
        self.providers.iter().map(|p| p.published).sum()
    }

    pub fn failed_providers(&self) -> usize {
        self.providers
            .iter()
            .filter(|p| p.outcome == ProviderOutcome::Failed)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs crawl cycles over a fixed provider list.
pub struct Orchestrator {
    providers: Vec<ProviderConfig>,
    sources: Arc<SourceRegistry>,
    enricher: Enricher,
    store: Arc<dyn SeenStore>,
    fan_out: FanOut,
    options: OrchestratorOptions,
}

impl Orchestrator {
    /// Disabled providers in `providers` are dropped here.
    pub fn new(
        providers: Vec<ProviderConfig>,
        sources: Arc<SourceRegistry>,
        enricher: Enricher,
        store: Arc<dyn SeenStore>,
        fan_out: FanOut,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            providers: providers.into_iter().filter(|p| p.enabled).collect(),
            sources,
            enricher,
            store,
            fan_out,
            options,
        }
    }

    /// Number of active sinks.
    pub fn sink_count(&self) -> usize {
        self.fan_out.len()
    }

    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    /// Run every provider once. Providers are isolated: one failing never
    /// stops another. Providers not yet started when `cancel` fires are
    /// reported as skipped.
    #[instrument(skip_all, fields(providers = self.providers.len()))]
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleReport {
        let start = Instant::now();

        let providers = if self.options.parallel_providers {
            join_all(self.providers.iter().map(|p| self.run_provider(p, cancel))).await
        } else {
            let mut reports = Vec::with_capacity(self.providers.len());
            for provider in &self.providers {
                reports.push(self.run_provider(provider, cancel).await);
            }
            reports
        };

        let report = CycleReport {
            providers,
            elapsed: start.elapsed(),
            cancelled: cancel.is_cancelled(),
        };

        info!(
            published = report.published(),
            failed_providers = report.failed_providers(),
            elapsed_ms = report.elapsed.as_millis(),
            cancelled = report.cancelled,
            "cycle completed"
        );
        report
    }

    #[instrument(skip_all, fields(provider = %provider.id))]
    async fn run_provider(
        &self,
        provider: &ProviderConfig,
        cancel: &CancellationToken,
    ) -> ProviderReport {
        if cancel.is_cancelled() {
            debug!("cycle cancelled, provider skipped");
            return ProviderReport::new(&provider.id, ProviderOutcome::Skipped);
        }

        let mut report = ProviderReport::new(&provider.id, ProviderOutcome::Done);

        // FETCH
        let items = match self.sources.fetch(provider, cancel).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "provider fetch failed");
                report.outcome = ProviderOutcome::Failed;
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.fetched = items.len();

        // ENRICH
        let items = if self.options.enrich {
            self.enricher.enrich(items, provider, cancel).await
        } else {
            items
        };

        // FILTER
        let fresh = self.filter_unseen(items, &mut report).await;

        // PUBLISH + MARK_SEEN
        for (index, item) in fresh.iter().enumerate() {
            if cancel.is_cancelled() {
                report.deferred = fresh.len() - index;
                warn!(
                    deferred = report.deferred,
                    "cycle cancelled, remaining items left for the next cycle"
                );
                break;
            }
            let event = Event::from(item);
            let delivery = self.fan_out.publish(&event).await;
            report.published += 1;
            report.delivery_failures += delivery.failed.len();

            if delivery.all_failed() && !self.options.mark_on_delivery_failure {
                debug!(item = %item.id, "no sink accepted the item, leaving it unmarked");
                continue;
            }
            match self.store.mark_seen(&item.id).await {
                Ok(()) => report.marked += 1,
                Err(e) => {
                    warn!(item = %item.id, error = %e, "failed to mark item seen");
                    report.store_errors += 1;
                }
            }
        }

        info!(
            fetched = report.fetched,
            duplicates = report.duplicates,
            published = report.published,
            delivery_failures = report.delivery_failures,
            marked = report.marked,
            deferred = report.deferred,
            store_errors = report.store_errors,
            "provider done"
        );
        report
    }

    /// Drop items already in the store or repeated earlier in this batch.
    /// A store error admits the item.
    async fn filter_unseen(&self, items: Vec<Item>, report: &mut ProviderReport) -> Vec<Item> {
        let mut batch = HashSet::with_capacity(items.len());
        let mut fresh = Vec::with_capacity(items.len());

        for item in items {
            if !batch.insert(item.id.clone()) {
                report.duplicates += 1;
                continue;
            }
            match self.store.contains(&item.id).await {
                Ok(true) => report.duplicates += 1,
                Ok(false) => fresh.push(item),
                Err(e) => {
                    warn!(item = %item.id, error = %e, "seen check failed, publishing anyway");
                    report.store_errors += 1;
                    fresh.push(item);
                }
            }
        }
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use feedrelay_shared::{FeedRelayError, HttpConfig, Result, SinkConfig, derive_id};
    use feedrelay_sinks::SinkRegistry;
    use feedrelay_sources::ReqwestTransport;
    use feedrelay_storage::{MemorySeenStore, NoopSeenStore};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn urlset(locs: &[&str]) -> String {
        let urls: String = locs
            .iter()
            .map(|l| format!("<url><loc>{l}</loc></url>"))
            .collect();
        format!("<urlset>{urls}</urlset>")
    }

    async fn feed_server(locs: &[&str]) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(urlset(locs)))
            .mount(&server)
            .await;
        server
    }

    async fn sink_server(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    async fn posts(server: &MockServer) -> usize {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == "POST")
            .count()
    }

    fn provider(id: &str, server: &MockServer) -> ProviderConfig {
        ProviderConfig::new(id, "google-news", format!("{}/sitemap.xml", server.uri()))
    }

    async fn orchestrator(
        providers: Vec<ProviderConfig>,
        sinks: &[SinkConfig],
        store: Arc<dyn SeenStore>,
        options: OrchestratorOptions,
    ) -> Orchestrator {
        let transport = Arc::new(ReqwestTransport::new(&HttpConfig::default()).unwrap());
        let sources = Arc::new(SourceRegistry::with_defaults(transport.clone()));
        let (built, errors) = SinkRegistry::default().build_all(sinks).await;
        assert!(errors.is_empty());
        Orchestrator::new(
            providers,
            sources,
            Enricher::new(transport, 10),
            store,
            FanOut::new(built),
            options,
        )
    }

    fn no_enrich() -> OrchestratorOptions {
        OrchestratorOptions {
            enrich: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn second_cycle_publishes_nothing_new() {
        let feed = feed_server(&["https://news.example.com/a", "https://news.example.com/b"]).await;
        let s1 = sink_server(200).await;
        let s2 = sink_server(500).await;
        let store = Arc::new(MemorySeenStore::new());

        let orch = orchestrator(
            vec![provider("p", &feed)],
            &[SinkConfig::http("s1", s1.uri()), SinkConfig::http("s2", s2.uri())],
            store.clone(),
            no_enrich(),
        )
        .await;

        let first = orch.run_cycle(&CancellationToken::new()).await;
        let p = &first.providers[0];
        assert_eq!(p.outcome, ProviderOutcome::Done);
        assert_eq!(p.fetched, 2);
        assert_eq!(p.published, 2);
        assert_eq!(p.delivery_failures, 2);
        assert_eq!(p.marked, 2);
        assert_eq!(posts(&s1).await, 2);
        assert_eq!(posts(&s2).await, 2);
        assert!(store.contains(&derive_id("https://news.example.com/a")).await.unwrap());
        assert!(store.contains(&derive_id("https://news.example.com/b")).await.unwrap());

        let second = orch.run_cycle(&CancellationToken::new()).await;
        assert_eq!(second.published(), 0);
        assert_eq!(second.providers[0].duplicates, 2);
        assert_eq!(posts(&s1).await, 2);
    }

    #[tokio::test]
    async fn noop_store_publishes_every_cycle() {
        let feed = feed_server(&["https://news.example.com/a", "https://news.example.com/b"]).await;
        let s1 = sink_server(200).await;
        let orch = orchestrator(
            vec![provider("p", &feed)],
            &[SinkConfig::http("s1", s1.uri())],
            Arc::new(NoopSeenStore),
            no_enrich(),
        )
        .await;

        orch.run_cycle(&CancellationToken::new()).await;
        orch.run_cycle(&CancellationToken::new()).await;
        assert_eq!(posts(&s1).await, 4);
    }

    #[tokio::test]
    async fn failing_provider_does_not_stop_others() {
        let broken = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&broken)
            .await;
        let feed = feed_server(&["https://news.example.com/a"]).await;
        let s1 = sink_server(200).await;

        let orch = orchestrator(
            vec![provider("broken", &broken), provider("good", &feed)],
            &[SinkConfig::http("s1", s1.uri())],
            Arc::new(MemorySeenStore::new()),
            no_enrich(),
        )
        .await;

        let report = orch.run_cycle(&CancellationToken::new()).await;
        assert_eq!(report.providers[0].outcome, ProviderOutcome::Failed);
        assert!(report.providers[0].error.as_deref().unwrap().contains("503"));
        assert_eq!(report.providers[1].outcome, ProviderOutcome::Done);
        assert_eq!(report.providers[1].published, 1);
        assert_eq!(report.failed_providers(), 1);
    }

    #[tokio::test]
    async fn repeated_url_in_one_feed_is_published_once() {
        let feed = feed_server(&["https://news.example.com/a", "https://news.example.com/a"]).await;
        let s1 = sink_server(200).await;
        let orch = orchestrator(
            vec![provider("p", &feed)],
            &[SinkConfig::http("s1", s1.uri())],
            Arc::new(NoopSeenStore),
            no_enrich(),
        )
        .await;

        let report = orch.run_cycle(&CancellationToken::new()).await;
        assert_eq!(report.providers[0].published, 1);
        assert_eq!(report.providers[0].duplicates, 1);
    }

    #[tokio::test]
    async fn unmarked_after_total_failure_when_configured() {
        let feed = feed_server(&["https://news.example.com/a"]).await;
        let down = sink_server(500).await;
        let store = Arc::new(MemorySeenStore::new());
        let orch = orchestrator(
            vec![provider("p", &feed)],
            &[SinkConfig::http("down", down.uri())],
            store.clone(),
            OrchestratorOptions {
                enrich: false,
                mark_on_delivery_failure: false,
                parallel_providers: false,
            },
        )
        .await;

        let first = orch.run_cycle(&CancellationToken::new()).await;
        assert_eq!(first.providers[0].marked, 0);
        assert_eq!(store.count().await, 0);

        let second = orch.run_cycle(&CancellationToken::new()).await;
        assert_eq!(second.providers[0].published, 1);
        assert_eq!(posts(&down).await, 2);
    }

    #[tokio::test]
    async fn marked_after_total_failure_by_default() {
        let feed = feed_server(&["https://news.example.com/a"]).await;
        let down = sink_server(500).await;
        let store = Arc::new(MemorySeenStore::new());
        let orch = orchestrator(
            vec![provider("p", &feed)],
            &[SinkConfig::http("down", down.uri())],
            store.clone(),
            no_enrich(),
        )
        .await;

        let first = orch.run_cycle(&CancellationToken::new()).await;
        assert_eq!(first.providers[0].marked, 1);
        let second = orch.run_cycle(&CancellationToken::new()).await;
        assert_eq!(second.published(), 0);
    }

    struct BrokenStore;

    #[async_trait]
    impl SeenStore for BrokenStore {
        async fn contains(&self, _id: &str) -> Result<bool> {
            Err(FeedRelayError::Storage("disk I/O error".into()))
        }
        async fn mark_seen(&self, _id: &str) -> Result<()> {
            Err(FeedRelayError::Storage("disk I/O error".into()))
        }
        async fn sweep_expired(&self, _ttl: Duration) -> Result<u64> {
            Err(FeedRelayError::Storage("disk I/O error".into()))
        }
    }

    #[tokio::test]
    async fn store_errors_fail_open() {
        let feed = feed_server(&["https://news.example.com/a", "https://news.example.com/b"]).await;
        let s1 = sink_server(200).await;
        let orch = orchestrator(
            vec![provider("p", &feed)],
            &[SinkConfig::http("s1", s1.uri())],
            Arc::new(BrokenStore),
            no_enrich(),
        )
        .await;

        let report = orch.run_cycle(&CancellationToken::new()).await;
        let p = &report.providers[0];
        assert_eq!(p.outcome, ProviderOutcome::Done);
        assert_eq!(p.published, 2);
        assert_eq!(p.marked, 0);
        assert_eq!(p.store_errors, 4);
    }

    #[tokio::test]
    async fn cancelled_cycle_skips_providers() {
        let feed = feed_server(&["https://news.example.com/a"]).await;
        let s1 = sink_server(200).await;
        let orch = orchestrator(
            vec![provider("p1", &feed), provider("p2", &feed)],
            &[SinkConfig::http("s1", s1.uri())],
            Arc::new(MemorySeenStore::new()),
            no_enrich(),
        )
        .await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = orch.run_cycle(&cancel).await;
        assert!(report.cancelled);
        assert!(report
            .providers
            .iter()
            .all(|p| p.outcome == ProviderOutcome::Skipped));
        assert_eq!(posts(&s1).await, 0);
    }

    #[tokio::test]
    async fn cancellation_during_publish_defers_remaining_items() {
        let feed = feed_server(&[
            "https://news.example.com/a",
            "https://news.example.com/b",
            "https://news.example.com/c",
        ])
        .await;
        let slow = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(600)))
            .mount(&slow)
            .await;
        let store = Arc::new(MemorySeenStore::new());
        let orch = orchestrator(
            vec![provider("p", &feed)],
            &[SinkConfig::http("slow", slow.uri())],
            store.clone(),
            no_enrich(),
        )
        .await;

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            stopper.cancel();
        });

        let report = orch.run_cycle(&cancel).await;
        let p = &report.providers[0];
        assert_eq!(p.outcome, ProviderOutcome::Done);
        assert_eq!(p.published, 1);
        assert_eq!(p.marked, 1);
        assert_eq!(p.deferred, 2);
        assert_eq!(posts(&slow).await, 1);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn enrichment_metadata_reaches_sinks() {
        let server = MockServer::start().await;
        let page_url = format!("{}/story", server.uri());
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&[&page_url])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head><meta property="og:title" content="Enriched"></head></html>"#,
            ))
            .mount(&server)
            .await;
        let s1 = sink_server(200).await;

        let orch = orchestrator(
            vec![provider("p", &server)],
            &[SinkConfig::http("s1", s1.uri())],
            Arc::new(MemorySeenStore::new()),
            OrchestratorOptions::default(),
        )
        .await;
        orch.run_cycle(&CancellationToken::new()).await;

        let requests = s1.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["title"], "Enriched");
        assert_eq!(body["id"], derive_id(&page_url));
    }

    #[tokio::test]
    async fn parallel_providers_are_all_reported() {
        let a = feed_server(&["https://news.example.com/a"]).await;
        let b = feed_server(&["https://news.example.com/b"]).await;
        let s1 = sink_server(200).await;
        let orch = orchestrator(
            vec![provider("a", &a), provider("b", &b)],
            &[SinkConfig::http("s1", s1.uri())],
            Arc::new(MemorySeenStore::new()),
            OrchestratorOptions {
                enrich: false,
                mark_on_delivery_failure: true,
                parallel_providers: true,
            },
        )
        .await;

        let report = orch.run_cycle(&CancellationToken::new()).await;
        let ids: Vec<&str> = report.providers.iter().map(|p| p.provider_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(report.published(), 2);
        assert_eq!(posts(&s1).await, 2);
    }
}
