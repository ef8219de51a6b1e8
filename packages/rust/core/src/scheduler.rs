//! Long-running service loops: crawl cycles and TTL sweeps.

use std::sync::Arc;
use std::time::Duration;

use feedrelay_storage::SeenStore;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::orchestrator::{CycleReport, Orchestrator};

/// Timing for [`Scheduler`].
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    pub crawl_interval: Duration,
    pub sweep_interval: Duration,
    pub cycle_timeout: Duration,
    pub ttl: Duration,
}

/// Drives the orchestrator on a fixed interval and sweeps the seen store on
/// its own interval, until shutdown.
pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn SeenStore>,
    options: SchedulerOptions,
}

impl Scheduler {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        store: Arc<dyn SeenStore>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            orchestrator,
            store,
            options,
        }
    }

    /// Run both loops until `shutdown` is cancelled. The first cycle and the
    /// first sweep start immediately.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            crawl_interval_secs = self.options.crawl_interval.as_secs(),
            sweep_interval_secs = self.options.sweep_interval.as_secs(),
            cycle_timeout_secs = self.options.cycle_timeout.as_secs(),
            "service started"
        );
        tokio::join!(self.crawl_loop(&shutdown), self.sweep_loop(&shutdown));
        info!("service stopped");
    }

    async fn crawl_loop(&self, shutdown: &CancellationToken) {
        let mut ticker = tokio::time::interval(self.options.crawl_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.run_cycle_with_deadline(shutdown).await;
        }
    }

    /// One cycle under a child token that is cancelled on shutdown or when
    /// the cycle deadline passes.
    pub async fn run_cycle_with_deadline(&self, shutdown: &CancellationToken) -> CycleReport {
        let cycle = shutdown.child_token();
        let deadline = {
            let cycle = cycle.clone();
            let timeout = self.options.cycle_timeout;
            tokio::spawn(async move {
                tokio::select! {
                    _ = cycle.cancelled() => {}
                    _ = tokio::time::sleep(timeout) => {
                        warn!(timeout_secs = timeout.as_secs(), "cycle deadline reached, cancelling");
                        cycle.cancel();
                    }
                }
            })
        };

        let report = self.orchestrator.run_cycle(&cycle).await;

        cycle.cancel();
        if let Err(e) = deadline.await {
            warn!(error = %e, "deadline task failed");
        }
        report
    }

    async fn sweep_loop(&self, shutdown: &CancellationToken) {
        let mut ticker = tokio::time::interval(self.options.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match self.store.sweep_expired(self.options.ttl).await {
                Ok(removed) => info!(removed, "seen store swept"),
                Err(e) => warn!(error = %e, "seen store sweep failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{OrchestratorOptions, ProviderOutcome};
    use feedrelay_crawler::Enricher;
    use feedrelay_shared::{HttpConfig, ProviderConfig, SinkConfig};
    use feedrelay_sinks::{FanOut, SinkRegistry};
    use feedrelay_sources::{ReqwestTransport, SourceRegistry};
    use feedrelay_storage::MemorySeenStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn scheduler(
        feed: &MockServer,
        sink: &MockServer,
        store: Arc<MemorySeenStore>,
        options: SchedulerOptions,
    ) -> Scheduler {
        let transport = Arc::new(ReqwestTransport::new(&HttpConfig::default()).unwrap());
        let (sinks, _) = SinkRegistry::default()
            .build_all(&[SinkConfig::http("s1", sink.uri())])
            .await;
        let orchestrator = Orchestrator::new(
            vec![ProviderConfig::new(
                "p",
                "google-news",
                format!("{}/sitemap.xml", feed.uri()),
            )],
            Arc::new(SourceRegistry::with_defaults(transport.clone())),
            Enricher::new(transport, 10),
            store.clone(),
            FanOut::new(sinks),
            OrchestratorOptions {
                enrich: false,
                ..Default::default()
            },
        );
        Scheduler::new(Arc::new(orchestrator), store, options)
    }

    fn options(cycle_timeout: Duration) -> SchedulerOptions {
        SchedulerOptions {
            crawl_interval: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(3600),
            cycle_timeout,
            ttl: Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn deadline_cancels_slow_cycle() {
        let feed = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<urlset><url><loc>https://a.example.com/x</loc></url></urlset>")
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&feed)
            .await;
        let sink = MockServer::start().await;

        let scheduler = scheduler(
            &feed,
            &sink,
            Arc::new(MemorySeenStore::new()),
            options(Duration::from_millis(200)),
        )
        .await;

        let report = scheduler
            .run_cycle_with_deadline(&CancellationToken::new())
            .await;
        assert!(report.cancelled);
        assert_eq!(report.providers[0].outcome, ProviderOutcome::Failed);
        assert!(report.elapsed < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_after_first_cycle() {
        let feed = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<urlset><url><loc>https://a.example.com/x</loc></url></urlset>"),
            )
            .mount(&feed)
            .await;
        let sink = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&sink)
            .await;

        let store = Arc::new(MemorySeenStore::new());
        store.mark_seen_at("stale", 0).await;
        let scheduler = scheduler(&feed, &sink, store.clone(), options(Duration::from_secs(5))).await;

        let shutdown = CancellationToken::new();
        let stopper = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            stopper.cancel();
        });

        tokio::time::timeout(Duration::from_secs(10), scheduler.run(shutdown))
            .await
            .expect("scheduler stops on shutdown");

        assert_eq!(sink.received_requests().await.unwrap().len(), 1);
        // The initial sweep removed the stale record; the cycle marked one item.
        assert_eq!(store.count().await, 1);
    }
}
