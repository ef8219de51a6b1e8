//! Startup wiring: config → registries, store, sinks, orchestrator.

use std::sync::Arc;

use feedrelay_crawler::Enricher;
use feedrelay_shared::{AppConfig, FeedRelayError, Result};
use feedrelay_sinks::{FanOut, SinkRegistry};
use feedrelay_sources::{ReqwestTransport, SourceRegistry};
use feedrelay_storage::{SeenStore, open_seen_store};
use tracing::{info, instrument, warn};

use crate::orchestrator::{Orchestrator, OrchestratorOptions};
use crate::scheduler::{Scheduler, SchedulerOptions};

/// Everything a running instance needs, built once at startup.
pub struct Service {
    pub config: AppConfig,
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn SeenStore>,
}

impl Service {
    /// Build the service. Unknown provider types are fatal. A sink that fails
    /// to build is logged and left out; only an empty sink set is fatal.
    #[instrument(skip_all, fields(providers = config.providers.len(), sinks = config.sinks.len()))]
    pub async fn build(config: AppConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.http)?);
        let sources = Arc::new(SourceRegistry::with_defaults(transport.clone()));
        check_provider_types(&config, &sources)?;

        let (sinks, errors) = SinkRegistry::default()
            .build_all(&config.sinks)
            .await;
        for error in &errors {
            warn!(error = %error, "sink left out of the active set");
        }
        if sinks.is_empty() {
            return Err(FeedRelayError::config("no enabled sinks could be built"));
        }

        let store = open_seen_store(&config.dedupe).await?;
        let orchestrator = Orchestrator::new(
            config.providers.clone(),
            sources,
            Enricher::new(transport, config.enrichment.workers),
            Arc::clone(&store),
            FanOut::new(sinks),
            OrchestratorOptions::from(&config),
        );

        info!(
            providers = orchestrator.providers().len(),
            sinks = orchestrator.sink_count(),
            "service wired"
        );

        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
            store,
        })
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            Arc::clone(&self.orchestrator),
            Arc::clone(&self.store),
            SchedulerOptions {
                crawl_interval: self.config.service.crawl_interval(),
                sweep_interval: self.config.service.sweep_interval(),
                cycle_timeout: self.config.service.cycle_timeout(),
                ttl: self.config.dedupe.ttl(),
            },
        )
    }
}

/// Every enabled provider's type must have a registered strategy.
pub fn check_provider_types(config: &AppConfig, sources: &SourceRegistry) -> Result<()> {
    for provider in config.providers.iter().filter(|p| p.enabled) {
        if !sources.supports(&provider.kind) {
            return Err(FeedRelayError::config(format!(
                "provider {:?}: unsupported type {:?} (known: {})",
                provider.id,
                provider.kind,
                sources.provider_types().join(", ")
            )));
        }
    }
    Ok(())
}

/// Dry-run startup checks: provider types and sink construction. Returns
/// every problem found rather than stopping at the first.
pub async fn check_config(config: &AppConfig) -> Result<Vec<FeedRelayError>> {
    let transport = Arc::new(ReqwestTransport::new(&config.http)?);
    let sources = SourceRegistry::with_defaults(transport);

    let mut problems = Vec::new();
    if let Err(e) = check_provider_types(config, &sources) {
        problems.push(e);
    }
    let (_, errors) = SinkRegistry::default().build_all(&config.sinks).await;
    problems.extend(errors);
    Ok(problems)
}
