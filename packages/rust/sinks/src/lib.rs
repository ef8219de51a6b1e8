//! Delivery sinks and fan-out.
//!
//! A [`SinkRegistry`] maps a sink type (`http`, `queue`) to a
//! [`SinkBuilder`]. [`FanOut`] delivers one event to every built sink
//! concurrently; one sink failing never affects another.

#[cfg(feature = "aws")]
pub mod aws;
#[cfg(feature = "gcp")]
pub mod gcp;
pub mod http;
pub mod queue;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use feedrelay_shared::config::{SINK_TYPE_HTTP, SINK_TYPE_QUEUE};
use feedrelay_shared::{Event, FeedRelayError, Result, SinkConfig};
use futures::future::join_all;
use tracing::{debug, info, warn};

pub use http::HttpSink;
pub use queue::{PROVIDER_ID_ATTRIBUTE, QueueMessage, QueueSender, QueueSink};

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// A delivery target for events.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Configured sink id.
    fn id(&self) -> &str;

    /// Sink type, e.g. `http`.
    fn kind(&self) -> &'static str;

    /// Deliver one event. No retries.
    async fn publish(&self, event: &Event) -> Result<()>;
}

/// Constructs sinks of one type from config.
#[async_trait]
pub trait SinkBuilder: Send + Sync {
    async fn build(&self, config: &SinkConfig) -> Result<Arc<dyn Sink>>;
}

struct HttpSinkBuilder;

#[async_trait]
impl SinkBuilder for HttpSinkBuilder {
    async fn build(&self, config: &SinkConfig) -> Result<Arc<dyn Sink>> {
        let http = config
            .http
            .as_ref()
            .ok_or_else(|| FeedRelayError::sink_build(&config.id, "missing [sinks.http] table"))?;
        Ok(Arc::new(HttpSink::new(&config.id, http)?))
    }
}

struct QueueSinkBuilder;

#[async_trait]
impl SinkBuilder for QueueSinkBuilder {
    async fn build(&self, config: &SinkConfig) -> Result<Arc<dyn Sink>> {
        let queue = config
            .queue
            .as_ref()
            .ok_or_else(|| FeedRelayError::sink_build(&config.id, "missing [sinks.queue] table"))?;
        Ok(Arc::new(QueueSink::from_config(&config.id, queue).await?))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Lookup table from sink type to [`SinkBuilder`].
pub struct SinkRegistry {
    builders: HashMap<String, Arc<dyn SinkBuilder>>,
}

impl Default for SinkRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(SINK_TYPE_HTTP, Arc::new(HttpSinkBuilder));
        registry.register(SINK_TYPE_QUEUE, Arc::new(QueueSinkBuilder));
        registry
    }
}

impl SinkRegistry {
    /// A registry with no builders.
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Add or replace the builder for `sink_type`.
    pub fn register(&mut self, sink_type: &str, builder: Arc<dyn SinkBuilder>) {
        self.builders.insert(sink_type.to_string(), builder);
    }

    /// Build one sink. The type must match a registered builder exactly.
    pub async fn build(&self, config: &SinkConfig) -> Result<Arc<dyn Sink>> {
        let builder =
            self.builders
                .get(&config.kind)
                .ok_or_else(|| FeedRelayError::UnsupportedSinkType {
                    sink: config.id.clone(),
                    sink_type: config.kind.clone(),
                })?;
        builder.build(config).await
    }

    /// Build every enabled sink. Failures are collected, not fatal, so one bad
    /// entry never keeps the others from being built.
    pub async fn build_all(
        &self,
        configs: &[SinkConfig],
    ) -> (Vec<Arc<dyn Sink>>, Vec<FeedRelayError>) {
        let mut sinks = Vec::new();
        let mut errors = Vec::new();

        for config in configs {
            if !config.enabled {
                debug!(sink = %config.id, "sink disabled, skipping");
                continue;
            }
            match self.build(config).await {
                Ok(sink) => {
                    info!(sink = %config.id, kind = sink.kind(), "sink ready");
                    sinks.push(sink);
                }
                Err(e) => {
                    warn!(sink = %config.id, error = %e, "sink could not be built");
                    errors.push(e);
                }
            }
        }

        (sinks, errors)
    }
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

/// Outcome of delivering one event to every sink.
#[derive(Debug, Default)]
pub struct FanOutReport {
    /// Sinks that accepted the event.
    pub delivered: usize,
    /// `(sink id, error)` for each sink that did not.
    pub failed: Vec<(String, FeedRelayError)>,
}

impl FanOutReport {
    /// At least one sink was tried and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.delivered == 0 && !self.failed.is_empty()
    }
}

/// Delivers events to a fixed set of sinks.
#[derive(Clone, Default)]
pub struct FanOut {
    sinks: Vec<Arc<dyn Sink>>,
}

impl FanOut {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Call every sink once, concurrently, and collect the outcomes.
    pub async fn publish(&self, event: &Event) -> FanOutReport {
        let deliveries = self.sinks.iter().map(|sink| async move {
            (sink.id().to_string(), sink.publish(event).await)
        });

        let mut report = FanOutReport::default();
        for (sink_id, result) in join_all(deliveries).await {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(sink = %sink_id, event = %event.id, error = %e, "delivery failed");
                    report.failed.push((sink_id, e));
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::tests::RecordingSender;
    use feedrelay_shared::Item;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn event() -> Event {
        Event::from(&Item::new("p", "https://news.example.com/a").unwrap())
    }

    #[tokio::test]
    async fn build_all_collects_errors_and_skips_disabled() {
        let mut disabled = SinkConfig::http("off", "https://hooks.example.com/off");
        disabled.enabled = false;
        let mut unknown = SinkConfig::http("smtp", "https://hooks.example.com/x");
        unknown.kind = "smtp".into();
        let mut missing_table = SinkConfig::http("broken", "https://hooks.example.com/y");
        missing_table.http = None;

        let configs = vec![
            SinkConfig::http("a", "https://hooks.example.com/a"),
            disabled,
            unknown,
            missing_table,
            SinkConfig::http("b", "https://hooks.example.com/b"),
        ];

        let (sinks, errors) = SinkRegistry::default().build_all(&configs).await;
        let ids: Vec<&str> = sinks.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], FeedRelayError::UnsupportedSinkType { .. }));
        assert!(matches!(errors[1], FeedRelayError::SinkBuild { .. }));
    }

    #[tokio::test]
    async fn fan_out_isolates_failing_sink() {
        let ok = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&ok)
            .await;
        let failing = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&failing)
            .await;

        let registry = SinkRegistry::default();
        let (sinks, errors) = registry
            .build_all(&[
                SinkConfig::http("s1", ok.uri()),
                SinkConfig::http("s2", failing.uri()),
            ])
            .await;
        assert!(errors.is_empty());

        let report = FanOut::new(sinks).publish(&event()).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "s2");
        assert!(!report.all_failed());
    }

    #[tokio::test]
    async fn every_sink_failing_is_reported() {
        let down = Arc::new(RecordingSender {
            fail: true,
            ..Default::default()
        });
        let fan_out = FanOut::new(vec![
            Arc::new(QueueSink::new("q1", down.clone())),
            Arc::new(QueueSink::new("q2", down)),
        ]);
        let report = fan_out.publish(&event()).await;
        assert_eq!(report.delivered, 0);
        assert!(report.all_failed());
    }

    #[tokio::test]
    async fn custom_builder_can_be_registered() {
        struct RecordingBuilder(Arc<RecordingSender>);

        #[async_trait]
        impl SinkBuilder for RecordingBuilder {
            async fn build(&self, config: &SinkConfig) -> Result<Arc<dyn Sink>> {
                Ok(Arc::new(QueueSink::new(&config.id, self.0.clone())))
            }
        }

        let sender = Arc::new(RecordingSender::default());
        let mut registry = SinkRegistry::empty();
        registry.register("recording", Arc::new(RecordingBuilder(sender.clone())));

        let mut config = SinkConfig::http("r", "unused");
        config.kind = "recording".into();
        let sink = registry.build(&config).await.unwrap();
        sink.publish(&event()).await.unwrap();
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
    }
}
